//! Integration tests for manifests, settings, and the product registry.

use stagehand::config::{load_manifest, parse_manifest, resolve_string, InterpolationContext};
use stagehand::registry::{ProductContext, ProductRegistry};
use stagehand::runner::{Orchestrator, RunState};
use stagehand::settings::{keywords, SettingsStore};
use stagehand::steps::{StepStatus, WorkflowMask};
use stagehand::StagehandError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MANIFEST: &str = r#"
product: demo
settings:
  install_dir: /opt/demo
  port: 7000
configure:
  - name: write-config
    description: Write config for port ${port}
    command: echo "port=${port}" > app.conf
    required: true
    estimated_seconds: 2
  - name: pick-port
    description: Pick a free port
    command: echo "stagehand:set PORT=7100"
  - name: record-port
    description: Record port ${port}
    command: echo "$STAGEHAND_PORT" > port.txt
  - name: migrate
    command: "true"
    workflows: [upgrade]
remove:
  - name: cleanup
    description: Remove ${install_dir}
    actions:
      - description: Delete config
        command: rm app.conf
        required: true
      - description: Delete missing file
        command: rm does-not-exist
"#;

fn setup_project(content: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(".stagehand");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("product.yml"), content).unwrap();
    temp
}

fn context_for(root: &Path) -> ProductContext {
    let manifest = load_manifest(root, None).unwrap();
    let settings = SettingsStore::for_project(root)
        .load_or(manifest.settings.clone())
        .unwrap();
    ProductContext::new(manifest, settings, root)
}

#[test]
fn manifest_defaults_feed_interpolation() {
    let manifest = parse_manifest(MANIFEST, Path::new("product.yml")).unwrap();
    let ctx = InterpolationContext::new()
        .with_product(&manifest.product, Path::new("/srv"))
        .with_settings(&manifest.settings);

    let resolved = resolve_string("${product} on ${port} in ${project_root}", &ctx).unwrap();
    assert_eq!(resolved, "demo on 7000 in /srv");
}

#[test]
fn invalid_manifest_is_rejected_with_every_problem() {
    let temp = setup_project(
        r#"
product: ""
configure:
  - name: a
    command: "true"
  - name: a
    command: "true"
    workflows: [sideways]
"#,
    );

    let err = load_manifest(temp.path(), None).unwrap_err();
    let message = match err {
        StagehandError::ManifestValidationError { message } => message,
        other => panic!("expected a validation error, got {other}"),
    };
    assert!(message.contains("product"));
    assert!(message.contains("sideways"));
}

#[test]
fn registry_builds_plans_for_every_workflow() {
    let temp = setup_project(MANIFEST);
    let controller = ProductRegistry::with_builtins()
        .create(context_for(temp.path()))
        .unwrap();

    let configure = controller.configure_plan().unwrap();
    assert_eq!(configure.len(), 4);
    assert_eq!(configure.filtered(WorkflowMask::INSTALL).count(), 3);
    assert_eq!(configure.steps()[0].description(), "Write config for port 7000");

    let remove = controller.remove_plan().unwrap();
    assert!(remove.steps()[0].is_group());
    assert_eq!(remove.steps()[0].description(), "Remove /opt/demo");
}

#[test]
fn unknown_kind_is_an_error() {
    let temp = setup_project("product: demo\nkind: msi\n");
    let result = ProductRegistry::with_builtins().create(context_for(temp.path()));
    assert!(matches!(
        result,
        Err(StagehandError::UnknownProductKind { ref kind }) if kind == "msi"
    ));
}

#[cfg(unix)]
#[test]
fn configure_then_remove_through_the_shell() {
    let temp = setup_project(MANIFEST);
    let root = temp.path();
    let context = context_for(root);
    let snapshot = context.settings().snapshot();
    let shared = std::sync::Arc::clone(&context.settings);
    let controller = ProductRegistry::with_builtins().create(context).unwrap();

    let mut configure = Orchestrator::new(controller.configure_plan().unwrap());
    let state = configure
        .configure_blocking(WorkflowMask::INSTALL)
        .unwrap();
    assert_eq!(state, RunState::Complete);

    assert_eq!(
        fs::read_to_string(root.join("app.conf")).unwrap().trim(),
        "port=7000"
    );
    // The directive from pick-port is visible to the step after it.
    assert_eq!(fs::read_to_string(root.join("port.txt")).unwrap().trim(), "7100");
    assert_eq!(configure.steps()[2].description, "Record port 7100");

    let current = shared.read().unwrap().clone();
    assert_eq!(current.changed_keys(&snapshot), vec!["PORT"]);
    let store = SettingsStore::for_project(root);
    assert!(store.save_if_changed(&current, &snapshot).unwrap());

    let mut remove = Orchestrator::new(controller.remove_plan().unwrap());
    let state = remove.remove_blocking(WorkflowMask::INSTALL).unwrap();
    assert_eq!(state, RunState::Complete);
    let group = &remove.steps()[0];
    assert_eq!(group.status, StepStatus::Finished);
    assert!(group.has_failed_substeps());
    assert!(!root.join("app.conf").exists());

    // Saved settings win over manifest defaults on the next load.
    assert_eq!(context_for(root).settings().port, 7100);
}

#[test]
fn keyword_overrides_validate_before_applying() {
    let mut settings = parse_manifest(MANIFEST, Path::new("product.yml"))
        .unwrap()
        .settings;

    keywords::apply(&mut settings, &["install_dir=/srv/demo", "PORT=7200"]).unwrap();
    assert_eq!(settings.install_dir, "/srv/demo");
    assert_eq!(settings.port, 7200);

    let err = keywords::apply(&mut settings, &["PORT=0"]).unwrap_err();
    assert!(matches!(err, StagehandError::InvalidSetting { .. }));
    assert_eq!(settings.port, 7200);

    let err = keywords::apply(&mut settings, &["COLOR=blue"]).unwrap_err();
    assert!(matches!(err, StagehandError::UnknownSetting { .. }));
}
