use crate::model::{
    ConfigFile, ConfigFileOverride, CreateOverrideRequest, GitCoordinates, GitSaveChoices,
    GitSaveRequest, ManifestConfig, ManifestOverride, OverrideScope, OverrideSpec, OverrideType,
    ProjectScope, StoreConfig, StoreConfigWrapper, StoreMetadata, Variable, VariableType,
};
use crate::store::traits::OverrideStore;
use anyhow::Result;
use log::info;
use serde_json::json;

fn request(
    project: &ProjectScope,
    override_type: OverrideType,
    scope: OverrideScope,
    spec: OverrideSpec,
) -> CreateOverrideRequest {
    CreateOverrideRequest {
        override_type,
        scope,
        org_identifier: project.org_identifier.clone(),
        project_identifier: project.project_identifier.clone(),
        spec,
    }
}

/// Inline demo overrides, one per override type
pub fn seed_requests(project: &ProjectScope) -> Vec<CreateOverrideRequest> {
    vec![
        request(
            project,
            OverrideType::EnvGlobal,
            OverrideScope::environment("dev"),
            OverrideSpec {
                variables: vec![
                    Variable::string("LOG_LEVEL", "debug"),
                    Variable::string("FEATURE_FLAGS", "beta,preview"),
                ],
                ..Default::default()
            },
        ),
        request(
            project,
            OverrideType::EnvService,
            OverrideScope::environment("dev").with_service("checkout"),
            OverrideSpec {
                variables: vec![
                    Variable::string("REPLICAS", "1"),
                    Variable {
                        name: "DB_PASSWORD".to_string(),
                        variable_type: VariableType::Secret,
                        value: json!("account.checkout_db_password"),
                    },
                ],
                manifests: vec![ManifestOverride {
                    manifest: ManifestConfig {
                        identifier: "checkout-values".to_string(),
                        manifest_type: "Values".to_string(),
                        spec: json!({"store": {"type": "Git", "spec": {"paths": ["dev/values.yaml"]}}}),
                    },
                }],
                application_settings: Some(StoreConfigWrapper {
                    store: StoreConfig {
                        store_type: "Harness".to_string(),
                        spec: json!({"files": ["/checkout/appsettings.json"]}),
                    },
                }),
                ..Default::default()
            },
        ),
        request(
            project,
            OverrideType::EnvService,
            OverrideScope::environment("prod").with_service("checkout"),
            OverrideSpec {
                variables: vec![Variable::string("REPLICAS", "4")],
                config_files: vec![ConfigFileOverride {
                    config_file: ConfigFile {
                        identifier: "nginx-conf".to_string(),
                        spec: json!({"store": {"type": "Harness", "spec": {"files": ["/nginx.conf"]}}}),
                    },
                }],
                ..Default::default()
            },
        ),
        request(
            project,
            OverrideType::InfraGlobal,
            OverrideScope::environment("prod").with_infra("k8s_eu"),
            OverrideSpec {
                variables: vec![Variable::string("REGION", "eu-west-1")],
                connection_strings: Some(StoreConfigWrapper {
                    store: StoreConfig {
                        store_type: "Harness".to_string(),
                        spec: json!({"files": ["/prod/connections.json"]}),
                    },
                }),
                ..Default::default()
            },
        ),
    ]
}

pub async fn load_seed_data<S: OverrideStore + ?Sized>(
    store: &S,
    project: &ProjectScope,
) -> Result<()> {
    for request in seed_requests(project) {
        let record = store.create_override(project, &request).await?;
        info!("seeded override {}", record.identifier);
    }

    // One git-backed override so the remote save flow has something to edit
    let remote = request(
        project,
        OverrideType::EnvService,
        OverrideScope::environment("staging").with_service("checkout"),
        OverrideSpec {
            variables: vec![Variable::string("REPLICAS", "2")],
            ..Default::default()
        },
    );
    let git = GitSaveRequest::new(
        &GitCoordinates::new(
            "github",
            "service-config",
            "main",
            ".harness/overrides/staging_checkout.yaml",
        ),
        &GitSaveChoices::commit("main", "Seed staging overrides"),
        &StoreMetadata::default(),
    );
    let record = store.create_remote_override(project, &remote, &git).await?;
    info!("seeded remote override {}", record.identifier);

    Ok(())
}
