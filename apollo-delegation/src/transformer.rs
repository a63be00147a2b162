//! The per-call transform chain.

use std::fmt;
use std::sync::Arc;

use crate::delegation_context::DelegationContext;
use crate::error::TransformError;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::transform::Transform;
use crate::transform::TransformContext;

/// An ordered list of transforms, each with its own [`TransformContext`].
///
/// Requests go through the stages first to last and results last to first, so the
/// first stage sees the least transformed request and has the final word on the
/// result. A chain belongs to one delegation and is dropped with it.
#[derive(Clone, Default)]
pub struct TransformChain {
    stages: Vec<(Arc<dyn Transform>, TransformContext)>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transform(
        &mut self,
        transform: Arc<dyn Transform>,
        context: TransformContext,
    ) -> &mut Self {
        self.stages.push((transform, context));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names, in request order.
    pub fn names(&self) -> Vec<&str> {
        self.stages
            .iter()
            .map(|(transform, _)| transform.name())
            .collect()
    }

    pub fn transform_request(
        &self,
        request: Request,
        delegation_context: &DelegationContext,
    ) -> Result<Request, TransformError> {
        self.stages
            .iter()
            .try_fold(request, |request, (transform, context)| {
                tracing::trace!(transform = transform.name(), "transforming request");
                transform.transform_request(request, context, delegation_context)
            })
    }

    pub fn transform_result(
        &self,
        result: Response,
        delegation_context: &DelegationContext,
    ) -> Response {
        self.stages
            .iter()
            .rev()
            .fold(result, |result, (transform, context)| {
                tracing::trace!(transform = transform.name(), "transforming result");
                transform.transform_result(result, context, delegation_context)
            })
    }
}

impl fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
