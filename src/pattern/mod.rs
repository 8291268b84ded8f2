//! Declarative pattern construction
//!
//! Pattern files describe trees of typed objects. The `Registry` maps each
//! type tag to a constructor descriptor and the `ObjectBuilder` turns a
//! `PatternNode` into a live value, or into a `Factory` for nodes marked
//! `__wrap__`.

pub mod builder;
pub mod constructors;
pub mod error;
pub mod node;
pub mod registry;
pub mod value;

pub use builder::{ObjectBuilder, Scene};
pub use error::{BuildError, ErrorKind};
pub use node::{LEAVE_FOR_CALLER, PatternNode};
pub use registry::{ConstructorSpec, ParamKind, ParamSpec, Registry, SemanticType};
pub use value::{Arg, Arguments, Built, Env, Factory, Mover};
