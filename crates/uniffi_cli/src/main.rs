/// Binding generator entry point
///
/// Swift goes through the dedicated swift generator, anything mentioning
/// kotlin through the generic one.
fn main() {
    let wants_kotlin = std::env::args().any(|arg| arg.to_ascii_lowercase().contains("kotlin"));

    if wants_kotlin { uniffi::uniffi_bindgen_main() } else { uniffi::uniffi_bindgen_swift() }
}
