//! Per-circuit rendering.

use log::trace;

use crate::circuit::{CircuitId, CircuitPlan, Endpoint, IDENTIFIER_FIELDS};
use crate::error::{ArgumentError, Result, TemplateError};
use crate::template::Template;

/// One circuit's configuration for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
    pub id: CircuitId,
    pub text: String,
}

/// Renders a template once per circuit of a plan.
#[derive(Debug, Clone, Copy)]
pub struct BlockRenderer<'a> {
    template: &'a Template,
    plan: &'a CircuitPlan,
}

impl<'a> BlockRenderer<'a> {
    /// Pair a template with a plan.
    ///
    /// A template that uses none of the per-circuit identifier fields would
    /// render the same block N times, so it is refused when the plan has
    /// more than one circuit.
    pub fn new(template: &'a Template, plan: &'a CircuitPlan) -> std::result::Result<Self, TemplateError> {
        if plan.range().len() > 1 && !IDENTIFIER_FIELDS.iter().any(|field| template.references(field)) {
            return Err(TemplateError::NoIdentifier {
                name: template.name().to_string(),
            });
        }
        Ok(Self { template, plan })
    }

    /// Render circuit `id` for `local`, peering with `remote`.
    pub fn render(&self, id: CircuitId, local: &Endpoint, remote: &Endpoint) -> Result<RenderedBlock> {
        let range = self.plan.range();
        if !range.contains(id) {
            return Err(ArgumentError::IdentifierOutOfRange {
                id: id.get(),
                start: range.start(),
                count: range.len(),
            }
            .into());
        }

        let fields = self.plan.fields(id, local, remote);
        let text = self.template.render(&fields)?;
        trace!("Rendered circuit {} for side {}", id, local.side);

        Ok(RenderedBlock { id, text })
    }

    /// Render every circuit of the plan, in identifier order.
    pub fn render_all(&self, local: &Endpoint, remote: &Endpoint) -> Result<Vec<RenderedBlock>> {
        self.plan
            .range()
            .iter()
            .map(|id| self.render(id, local, remote))
            .collect()
    }
}
