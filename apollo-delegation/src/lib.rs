//! Delegation of GraphQL operations to subschemas.
//!
//! A stitched gateway exposes one schema assembled from several independently owned
//! backends ("subschemas"). When a root field of that schema is resolved, the field is
//! *delegated*: the request is rewritten through an ordered chain of transforms until it
//! can be executed by the owning subschema, and the subschema's result is rewritten back
//! through the same chain, in reverse order, into the shape the caller asked for.
//!
//! The entry points are [`delegate_request`] and [`delegate_to_schema`].
//!
//! ```ignore
//! let result = delegate_request(
//!     DelegateRequest::builder()
//!         .request(request)
//!         .subschema(subschema)
//!         .context(Context::new())
//!         .build(),
//! )?;
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod context;
pub mod delegate;
pub mod delegation_context;
pub mod error;
pub mod executor;
pub mod graphql;
pub mod json_ext;
pub mod request;
pub mod resolve_info;
pub mod schema;
pub(crate) mod selection;
pub mod stitching;
pub mod subschema;
pub mod transform;
pub mod transformer;
pub mod transforms;
pub mod validation;
pub(crate) mod visitor;

pub use crate::context::Context;
pub use crate::delegate::DelegateRequest;
pub use crate::delegate::DelegateToSchema;
pub use crate::delegate::DelegationResult;
pub use crate::delegate::delegate_request;
pub use crate::delegate::delegate_to_schema;
pub use crate::delegation_context::DelegationContext;
pub use crate::delegation_context::OperationKind;
pub use crate::error::DelegationError;
pub use crate::error::TransformError;
pub use crate::resolve_info::ResolveInfo;
pub use crate::schema::Schema;
pub use crate::stitching::StitchingInfo;
pub use crate::subschema::ExecutionParams;
pub use crate::subschema::Executor;
pub use crate::subschema::ExecutorResult;
pub use crate::subschema::Subschema;
pub use crate::subschema::SubschemaConfig;
pub use crate::subschema::Subscriber;
pub use crate::subschema::SubscriptionResult;
pub use crate::transform::Transform;
pub use crate::transform::TransformContext;
pub use crate::transformer::TransformChain;
