pub fn print_version_info() {
    println!("ambler {}", env!("CARGO_PKG_VERSION"));
}
