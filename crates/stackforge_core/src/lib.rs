//! # stackforge_core
//!
//! Entity model, reference validation and serialization for declarative
//! infrastructure templates.
//!
//! A front end populates a [`Template`] with parameters, resources, outputs,
//! conditions, mappings and rules. Validation checks every reference against
//! the names the template defines and produces a [`ValidatedTemplate`], which
//! renders to an ordered document any serde encoder can write.
//!
//! ## Features
//!
//! - **Attribute Store**: ordered get/set/list/push/content storage with
//!   replacement warnings
//! - **Intrinsics**: a closed set of expression nodes that know what they reference
//! - **Validation**: unknown, self, null and cyclic references reported together
//! - **Serialization**: insertion-ordered documents with private key filtering
//!
//! ## Example
//!
//! ```rust
//! use stackforge_core::{Expr, Template};
//!
//! let template = Template::with_description("Web tier")
//!     .declare(|t| {
//!         t.parameter("InstanceType", |p| {
//!             p.default("t3.micro");
//!             Ok(())
//!         })?;
//!         t.typed_resource("Web", "AWS::EC2::Instance", |r| {
//!             r.property("InstanceType", Expr::reference("InstanceType"))?;
//!             Ok(())
//!         })?;
//!         t.output("WebId", |o| {
//!             o.value(Expr::reference("Web"));
//!             Ok(())
//!         })?;
//!         Ok(())
//!     })
//!     .unwrap()
//!     .validate()
//!     .unwrap();
//!
//! let json = serde_json::to_string_pretty(&template).unwrap();
//! assert!(json.contains("\"Ref\": \"InstanceType\""));
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod expr;
pub mod references;
pub mod serializer;
pub mod store;
pub mod template;
pub mod validator;
pub mod value;
pub mod variables;

pub use config::{TemplateConfig, TemplateKind};
pub use entity::{Attributes, Condition, Entity, Output, Parameter, Resource, Rule};
pub use error::{DslError, DslResult};
pub use expr::{Expr, NO_VALUE, PSEUDO_PARAMETERS};
pub use references::RefKind;
pub use serializer::ToDocument;
pub use store::AttributeStore;
pub use template::{Section, Template, ValidatedTemplate};
pub use validator::{Finding, TemplateValidator, ValidationFailure};
pub use value::{Block, Value};
pub use variables::VariableSource;
