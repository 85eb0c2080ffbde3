mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::Spinner;
pub use styling::{dim, magenta_bold};
pub use summary::render_summary;

/// Prints the `piper` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🚰 piper"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Jenkins pipeline state")
    );
}
