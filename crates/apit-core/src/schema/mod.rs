pub mod filter;
pub mod ids;
pub mod model;
pub mod operations;
pub mod resources;
pub mod types;
pub mod validate;

pub use model::Schema;
pub use operations::*;
pub use resources::ResourceDef;
pub use types::{
    BaseType, Constraints, Deprecation, EnumElement, EnumValue, FieldDef, TypeDef,
};
