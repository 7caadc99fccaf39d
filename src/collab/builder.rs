//! Template-based module generation.
//!
//! Produces module definitions (name, kind, size, dependencies) rather than
//! source text; the integrator only ever needs the definition.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::collab::Builder;
use crate::model::{CodeType, Endpoint, GeneratedModule, RequirementSpec};

/// Aggregate view over a set of generated modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WiringMetadata {
    pub modules: Vec<String>,
    /// De-duplicated, sorted.
    pub dependencies: Vec<String>,
    pub total_lines: usize,
}

/// Stateless template builder.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateBuilder;

impl TemplateBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Builder for TemplateBuilder {
    fn generate_client(&self, api_name: &str, endpoints: &[Endpoint]) -> GeneratedModule {
        GeneratedModule::new(format!("{}_client", api_name), CodeType::Client, 12 + 6 * endpoints.len())
            .with_dependencies(&["http", "serde"])
    }

    fn generate_agent(&self, capability_name: &str, spec: &RequirementSpec) -> GeneratedModule {
        let mut module = GeneratedModule::new(
            format!("{}_agent", capability_name),
            CodeType::Agent,
            40 + 5 * spec.required_apis.len(),
        );
        module.dependencies = spec.required_apis.iter().map(|api| format!("{}_client", api)).collect();
        module
    }

    fn generate_models(&self, capability_name: &str) -> GeneratedModule {
        GeneratedModule::new(format!("{}_model", capability_name), CodeType::Model, 20)
            .with_dependencies(&["serde"])
    }

    fn generate_tests(&self, capability_name: &str, modules: &[GeneratedModule]) -> GeneratedModule {
        let mut module = GeneratedModule::new(
            format!("{}_tests", capability_name),
            CodeType::Test,
            5 + 8 * modules.len(),
        );
        module.dependencies = modules.iter().map(|m| m.module_name.clone()).collect();
        module
    }

    fn wire_together(&self, modules: &[GeneratedModule]) -> WiringMetadata {
        let dependencies: BTreeSet<String> =
            modules.iter().flat_map(|m| m.dependencies.iter().cloned()).collect();
        WiringMetadata {
            modules: modules.iter().map(|m| m.module_name.clone()).collect(),
            dependencies: dependencies.into_iter().collect(),
            total_lines: modules.iter().map(|m| m.line_count).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuthMethod;

    fn endpoint(name: &str) -> Endpoint {
        Endpoint {
            name: name.to_string(),
            base_url: "https://api.test.com".into(),
            path: "/test".into(),
            method: "GET".into(),
            auth_method: AuthMethod::None,
        }
    }

    #[test]
    fn test_generate_client_names_and_sizes() {
        let m = TemplateBuilder::new().generate_client("telegram", &[endpoint("telegram.a"), endpoint("telegram.b")]);
        assert_eq!(m.module_name, "telegram_client");
        assert_eq!(m.code_type, CodeType::Client);
        assert_eq!(m.line_count, 24);
    }

    #[test]
    fn test_generate_agent_depends_on_clients() {
        let spec = RequirementSpec {
            parsed_intent: "send:telegram".into(),
            required_apis: vec!["telegram".into()],
            ..RequirementSpec::default()
        };
        let m = TemplateBuilder::new().generate_agent("send_telegram", &spec);
        assert_eq!(m.module_name, "send_telegram_agent");
        assert_eq!(m.dependencies, vec!["telegram_client".to_string()]);
    }

    #[test]
    fn test_generate_tests_covers_given_modules() {
        let b = TemplateBuilder::new();
        let model = b.generate_models("cap");
        let tests = b.generate_tests("cap", std::slice::from_ref(&model));
        assert_eq!(tests.code_type, CodeType::Test);
        assert_eq!(tests.dependencies, vec!["cap_model".to_string()]);
    }

    #[test]
    fn test_wire_together_aggregates() {
        let b = TemplateBuilder::new();
        let modules = vec![
            GeneratedModule::new("client", CodeType::Client, 10).with_dependencies(&["http", "serde"]),
            GeneratedModule::new("model", CodeType::Model, 20).with_dependencies(&["serde"]),
        ];
        let w = b.wire_together(&modules);
        assert_eq!(w.modules, vec!["client".to_string(), "model".to_string()]);
        assert_eq!(w.dependencies, vec!["http".to_string(), "serde".to_string()]);
        assert_eq!(w.total_lines, 30);
    }
}
