//! Operator templates.
//!
//! Templates use Jinja-style syntax and are rendered with tera. The variables a
//! template references are recorded at load time so a render can be checked
//! against the substitution map before tera runs.

mod placeholders;

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use tera::{Context, Tera};

use crate::error::{IoError, Result, TemplateError};

pub use placeholders::declared_placeholders;

/// An immutable, parsed template.
#[derive(Debug)]
pub struct Template {
    name: String,
    tera: Tera,
    placeholders: IndexSet<String>,
}

impl Template {
    /// Read and parse a template file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| IoError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::parse(name, &source)?)
    }

    /// Parse template source held in memory.
    pub fn parse(
        name: impl Into<String>,
        source: &str,
    ) -> std::result::Result<Self, TemplateError> {
        let name = name.into();

        let mut tera = Tera::default();
        // Device config, not HTML
        tera.autoescape_on(vec![]);
        tera.add_raw_template(&name, source)
            .map_err(|e| TemplateError::Syntax {
                name: name.clone(),
                message: error_chain(&e),
            })?;

        let placeholders = declared_placeholders(source);
        debug!("Template '{}' declares {:?}", name, placeholders);

        Ok(Self {
            name,
            tera,
            placeholders,
        })
    }

    /// Template name (file name when loaded from disk).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variables the template references, in order of first use.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(String::as_str)
    }

    /// Whether the template references `field`.
    pub fn references(&self, field: &str) -> bool {
        self.placeholders.contains(field)
    }

    /// Render with a strongly-typed field set.
    ///
    /// Every placeholder must be present in the substitution map built from
    /// `fields`; the first one missing fails with
    /// [`TemplateError::MissingField`] before anything is rendered.
    pub fn render<T: Serialize>(&self, fields: &T) -> std::result::Result<String, TemplateError> {
        let substitutions = Substitutions::from_fields(&self.name, fields)?;
        substitutions.check(self)?;

        let context = Context::from_value(substitutions.into_value()).map_err(|e| {
            TemplateError::Render {
                name: self.name.clone(),
                message: error_chain(&e),
            }
        })?;

        self.tera
            .render(&self.name, &context)
            .map_err(|e| TemplateError::Render {
                name: self.name.clone(),
                message: error_chain(&e),
            })
    }
}

/// Name → value map handed to tera.
#[derive(Debug, Clone)]
pub struct Substitutions(IndexMap<String, Value>);

impl Substitutions {
    /// Flatten a serializable struct into its top-level fields.
    pub fn from_fields<T: Serialize>(
        template: &str,
        fields: &T,
    ) -> std::result::Result<Self, TemplateError> {
        let render_err = |message: String| TemplateError::Render {
            name: template.to_string(),
            message,
        };

        match serde_json::to_value(fields).map_err(|e| render_err(e.to_string()))? {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(render_err(format!(
                "substitutions must be a map of fields, got {other}"
            ))),
        }
    }

    /// Fail on the first placeholder of `template` this map cannot fill.
    pub fn check(&self, template: &Template) -> std::result::Result<(), TemplateError> {
        match template.placeholders().find(|p| !self.0.contains_key(*p)) {
            Some(field) => Err(TemplateError::MissingField {
                name: template.name().to_string(),
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn into_value(self) -> Value {
        Value::Object(self.0.into_iter().collect())
    }
}

/// Tera keeps the useful detail in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Fields {
        vlan: u32,
        interface: String,
        offload: bool,
    }

    fn fields() -> Fields {
        Fields {
            vlan: 42,
            interface: "GigabitEthernet0/0/1".to_string(),
            offload: true,
        }
    }

    #[test]
    fn test_render_substitutes_fields() {
        let template = Template::parse(
            "efp",
            "interface {{ interface }}\n service instance {{ vlan }} ethernet\n",
        )
        .unwrap();
        let rendered = template.render(&fields()).unwrap();
        assert_eq!(
            rendered,
            "interface GigabitEthernet0/0/1\n service instance 42 ethernet\n"
        );
    }

    #[test]
    fn test_conditionals() {
        let template =
            Template::parse("cond", "{% if offload %}offload on{% else %}offload off{% endif %}")
                .unwrap();
        assert_eq!(template.render(&fields()).unwrap(), "offload on");
    }

    #[test]
    fn test_no_html_escaping() {
        #[derive(Serialize)]
        struct Desc {
            vlan: u32,
            text: String,
        }
        let template = Template::parse("desc", "description {{ text }} {{ vlan }}").unwrap();
        let rendered = template
            .render(&Desc {
                vlan: 1,
                text: "A<->Z & back".to_string(),
            })
            .unwrap();
        assert_eq!(rendered, "description A<->Z & back 1");
    }

    #[test]
    fn test_missing_field_fails_fast() {
        let template = Template::parse("bad", "xconnect {{ peer }} {{ vcid }}").unwrap();
        let err = template.render(&fields()).unwrap_err();
        match err {
            TemplateError::MissingField { name, field } => {
                assert_eq!(name, "bad");
                assert_eq!(field, "peer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error_on_parse() {
        let err = Template::parse("broken", "{% if vlan %}no endif").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_references() {
        let template = Template::parse("t", "{{ vlan }}").unwrap();
        assert!(template.references("vlan"));
        assert!(!template.references("vcid"));
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["vlan"]);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Template::load(Path::new("/nonexistent/l2vpn.j2")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l2vpn.j2");
        std::fs::write(&path, "vlan {{ vlan }}\n").unwrap();

        let template = Template::load(&path).unwrap();
        assert_eq!(template.name(), "l2vpn.j2");
        assert_eq!(template.render(&fields()).unwrap(), "vlan 42\n");
    }

    #[test]
    fn test_substitutions_reject_non_struct() {
        let err = Substitutions::from_fields("t", &42u32).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }
}
