pub mod fixture;
pub mod game_tester;
pub mod policy;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use fixture::TesterAssets;
pub use game_tester::GameTester;
pub use seeds::resolve_seed_inputs;
pub use tester::*;
