use anyhow::Result;

pub fn run() -> Result<()> {
    println!("fimors {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
