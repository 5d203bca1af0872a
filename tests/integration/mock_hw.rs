//! Mock adapters for integration tests.
//!
//! Every mock records what the node did to it so tests can assert on the
//! full history: datagrams sent, duties written, bolt drives, LED states.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;
use std::time::Duration;

use meshnode::app::events::NodeEvent;
use meshnode::app::ports::{
    CardReaderPort, CardUid, ClockPort, Datagram, EventSink, IndicatorPort, LightSensorPort,
    LockActuatorPort, PwmPort, StorageError, StoragePort, Transport,
};
use meshnode::app::service::NodeService;
use meshnode::config::{DeviceId, NodeConfig};
use meshnode::device::{LightNode, LockNode};

pub const LIGHT_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 137, 248);
pub const LOCK_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 137, 207);

// ── Transport ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Unicast(SocketAddrV4),
    Broadcast,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pub inbound: VecDeque<String>,
    pub sent: Vec<(String, Destination)>,
    pub recv_calls: usize,
    pub fail_sends: bool,
}

impl MockTransport {
    pub fn with_inbound(lines: &[&str]) -> Self {
        Self {
            inbound: lines.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, line: &str) {
        self.inbound.push_back(line.to_string());
    }

    /// Payloads sent to `to`, in order.
    pub fn sent_to(&self, to: SocketAddrV4) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(_, d)| *d == Destination::Unicast(to))
            .map(|(p, _)| p.as_str())
            .collect()
    }

    pub fn broadcasts(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(_, d)| *d == Destination::Broadcast)
            .map(|(p, _)| p.as_str())
            .collect()
    }
}

impl Transport for MockTransport {
    type Error = &'static str;

    fn send_to(&mut self, payload: &str, to: SocketAddrV4) -> Result<(), Self::Error> {
        if self.fail_sends {
            return Err("network unreachable");
        }
        self.sent.push((payload.to_string(), Destination::Unicast(to)));
        Ok(())
    }

    fn broadcast(&mut self, payload: &str) -> Result<(), Self::Error> {
        if self.fail_sends {
            return Err("network unreachable");
        }
        self.sent.push((payload.to_string(), Destination::Broadcast));
        Ok(())
    }

    fn recv(&mut self, _timeout: Duration) -> Result<Option<Datagram>, Self::Error> {
        self.recv_calls += 1;
        Ok(self
            .inbound
            .pop_front()
            .and_then(|line| Datagram::try_from(line.as_str()).ok()))
    }
}

// ── Light hardware ────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockLightHw {
    pub raw: u16,
    pub duties: Vec<u16>,
}

impl MockLightHw {
    pub fn with_raw(raw: u16) -> Self {
        Self {
            raw,
            duties: Vec::new(),
        }
    }

    pub fn last_duty(&self) -> Option<u16> {
        self.duties.last().copied()
    }
}

impl LightSensorPort for MockLightHw {
    fn read_raw(&mut self) -> u16 {
        self.raw
    }
}

impl PwmPort for MockLightHw {
    fn set_duty(&mut self, duty: u16) {
        self.duties.push(duty);
    }
}

// ── Lock hardware ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoltCall {
    Engage,
    Release,
}

#[derive(Debug, Default)]
pub struct MockBolt {
    pub calls: Vec<BoltCall>,
}

impl LockActuatorPort for MockBolt {
    fn engage(&mut self) {
        self.calls.push(BoltCall::Engage);
    }

    fn release(&mut self) {
        self.calls.push(BoltCall::Release);
    }
}

/// Card reader fed from a shared queue so tests can present cards after
/// the node owns the reader.
#[derive(Debug, Default, Clone)]
pub struct MockCards {
    pub queue: Rc<RefCell<VecDeque<CardUid>>>,
}

impl MockCards {
    pub fn present(&self, uid: &[u8]) {
        if let Ok(uid) = CardUid::from_slice(uid) {
            self.queue.borrow_mut().push_back(uid);
        }
    }
}

impl CardReaderPort for MockCards {
    fn poll_card(&mut self) -> Option<CardUid> {
        self.queue.borrow_mut().pop_front()
    }
}

// ── Indicator ─────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MockLed {
    pub states: Rc<RefCell<Vec<bool>>>,
}

impl IndicatorPort for MockLed {
    fn set_indicator(&mut self, on: bool) {
        self.states.borrow_mut().push(on);
    }
}

// ── Storage ───────────────────────────────────────────────────

/// Cloneable store: clones share contents, so a test can keep a handle
/// and rebuild a node on the same data to simulate a restart.
#[derive(Debug, Default, Clone)]
pub struct SharedStore {
    data: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    pub fail_writes: Rc<Cell<bool>>,
}

impl SharedStore {
    fn key(namespace: &str, key: &str) -> String {
        format!("{namespace}/{key}")
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }
}

impl StoragePort for SharedStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.data.borrow();
        let value = data
            .get(&Self::key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        let len = value.len().min(buf.len());
        buf[..len].copy_from_slice(&value[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::IoError);
        }
        self.data
            .borrow_mut()
            .insert(Self::key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.borrow_mut().remove(&Self::key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.borrow().contains_key(&Self::key(namespace, key))
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeClock(Cell<u64>);

impl FakeClock {
    pub fn at(ms: u64) -> Self {
        Self(Cell::new(ms))
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl ClockPort for FakeClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

// ── Event recorder ────────────────────────────────────────────

/// Owned copy of a [`NodeEvent`], so tests can hold it past the borrow.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Started(String),
    Applied { command: String, via_mesh: bool },
    Ignored(String),
    Rejected(String),
    Relayed(String),
    Dropped(String),
    SendFailed(&'static str),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<Recorded>,
}

impl RecordingSink {
    pub fn applied(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Recorded::Applied { command, .. } => Some(command.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &NodeEvent<'_>) {
        let rec = match event {
            NodeEvent::Started { device_id, .. } => Recorded::Started(device_id.to_string()),
            NodeEvent::CommandApplied { command, via_mesh } => Recorded::Applied {
                command: command.to_string(),
                via_mesh: *via_mesh,
            },
            NodeEvent::CommandIgnored { command, .. } => Recorded::Ignored(command.to_string()),
            NodeEvent::CommandRejected { text, .. } => Recorded::Rejected(text.to_string()),
            NodeEvent::Relayed(env) => Recorded::Relayed(env.to_string()),
            NodeEvent::TtlExpired(env) => Recorded::Dropped(env.to_string()),
            NodeEvent::SendFailed { what } => Recorded::SendFailed(*what),
        };
        self.events.push(rec);
    }
}

// ── Service builders ──────────────────────────────────────────

pub type LightService = NodeService<LightNode<MockLightHw, SharedStore>, MockLed>;
pub type LockService = NodeService<LockNode<MockBolt, MockCards>, MockLed>;

pub fn node_config(id: &str) -> NodeConfig {
    let mut cfg = NodeConfig::default();
    cfg.device_id = DeviceId::try_from(id).expect("test id fits");
    cfg
}

pub fn master() -> SocketAddrV4 {
    NodeConfig::default().master
}

pub fn light_service(cfg: NodeConfig, raw: u16, store: SharedStore) -> LightService {
    let device = LightNode::new(&cfg, MockLightHw::with_raw(raw), store);
    NodeService::new(cfg, LIGHT_ADDR, device, MockLed::default(), 0)
}

pub fn lock_service(cfg: NodeConfig, cards: MockCards) -> LockService {
    let device = LockNode::new(&cfg, MockBolt::default(), cards);
    NodeService::new(cfg, LOCK_ADDR, device, MockLed::default(), 0)
}
