pub mod check;
pub mod classify;
pub mod fix;

pub use check::CheckHandler;
pub use classify::ClassifyHandler;
pub use fix::FixHandler;

const PASS: &str = "\u{2713}";
const FAIL: &str = "\u{2717}";
