fn main() {
    println!("cargo:rerun-if-env-changed=PWRSHIELD_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=PWRSHIELD_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=PWRSHIELD_MQTT_USER");
    println!("cargo:rerun-if-env-changed=PWRSHIELD_MQTT_PASSWORD");

    // Host builds (tests, simulation) have no ESP-IDF environment to export.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
