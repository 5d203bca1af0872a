fn main() {
    // Node identity and network credentials are baked in per image.
    for var in [
        "MESHNODE_DEVICE_ID",
        "MESHNODE_ROLE",
        "MESHNODE_HOST_OCTET",
        "MESHNODE_RELAY_MODE",
        "MESHNODE_WIFI_SSID",
        "MESHNODE_WIFI_PASS",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
