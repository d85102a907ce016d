//! Reusable contract templates: a stored document plus a field layout bound
//! to signer slots instead of concrete recipients.

use chrono::Utc;
use uuid::Uuid;

use signet_core::models::field::geometry_is_normalized;
use signet_core::models::{FieldKind, Template, TemplateField};
use signet_core::validation::validate_pdf;

use crate::error::{Result, ServiceError};
use crate::ContractService;

#[derive(Debug)]
pub struct CreateTemplateParams {
    pub name: String,
    pub document: Vec<u8>,
    pub fields: Vec<TemplateFieldInput>,
}

#[derive(Debug, Clone)]
pub struct TemplateFieldInput {
    /// 0-based signer slot the field binds to at instantiation time.
    pub signer_index: u32,
    pub kind: FieldKind,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub required: bool,
}

impl ContractService {
    /// Validate and store a template. Field geometry and page bounds are
    /// checked here so instantiation never has to re-validate the layout.
    pub async fn create_template(&self, params: CreateTemplateParams) -> Result<Template> {
        if params.name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "template name must not be empty".to_string(),
            ));
        }
        let summary = validate_pdf(&params.document)?;

        let template = Template {
            id: Uuid::new_v4(),
            name: params.name,
            document_data: params.document,
            created_at: Utc::now(),
        };

        let fields: Vec<TemplateField> = params
            .fields
            .iter()
            .map(|input| {
                if !geometry_is_normalized(input.x, input.y, input.width, input.height) {
                    return Err(ServiceError::Validation(
                        "template field geometry must be normalized to [0, 1]".to_string(),
                    ));
                }
                if input.page == 0 || input.page as usize > summary.page_count {
                    return Err(ServiceError::Validation(format!(
                        "template field page {} is outside the document ({} pages)",
                        input.page, summary.page_count
                    )));
                }
                Ok(TemplateField {
                    id: Uuid::new_v4(),
                    template_id: template.id,
                    signer_index: input.signer_index,
                    kind: input.kind,
                    page: input.page,
                    x: input.x,
                    y: input.y,
                    width: input.width,
                    height: input.height,
                    required: input.required,
                })
            })
            .collect::<Result<_>>()?;

        self.store().insert_template(&template, &fields).await?;
        Ok(template)
    }

    pub async fn get_template(&self, id: Uuid) -> Result<Option<(Template, Vec<TemplateField>)>> {
        Ok(self.store().fetch_template(id).await?)
    }
}
