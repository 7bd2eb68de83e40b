pub mod env;
pub mod extract;
pub mod process;
pub mod runtime_resolver;
pub mod toolchain;

pub use env::builder::{Bootstrapper, EnvironmentState, ProvisioningResult};
pub use extract::{ExtractedResource, ResourceExtractor};
pub use process::{CommandSpec, ProcessRunner, Purpose, RunOutcome, SystemRunner};
pub use toolchain::{SearchPath, ToolAvailability, ToolLocator};
