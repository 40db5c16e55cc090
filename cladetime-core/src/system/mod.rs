pub mod clock;
pub mod paths;

pub use clock::{Clock, FixedClock, SystemClock};
pub use paths::{cladetime_cache_dir, cladetime_home, default_assignment_output};
