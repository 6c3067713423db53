fn main() {
    // ESP-IDF link arguments only matter for the device build; host builds
    // (simulator, tests) skip them.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
