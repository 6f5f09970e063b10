//! ---
//! srt_section: "03-persistence-logging"
//! srt_subsection: "tests"
//! srt_type: "test"
//! srt_scope: "code"
//! srt_description: "On-disk layout of technique state directories."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::fs;

use stratus_persistence::{
    FileSystemStateManager, StateManager, DATA_STORE_FILE_NAME, STATE_FILE_NAME,
    TERRAFORM_FILE_NAME, TERRAFORM_OUTPUTS_FILE_NAME, TERRAFORM_VARIABLES_FILE_NAME,
};
use stratus_technique::{AttackTechniqueState, Outputs, Variables};
use tempfile::tempdir;

#[test]
fn full_layout_survives_reopen() -> anyhow::Result<()> {
    let root = tempdir()?;
    let id = "k8s.credential-access.steal-serviceaccount-token";
    {
        let mut manager = FileSystemStateManager::new(root.path(), id)?;
        manager.extract_technique(b"resource \"kubernetes_pod\" \"x\" {}")?;
        manager.write_terraform_outputs(&Outputs::from([(
            "pod_name".to_owned(),
            "stratus-pod".to_owned(),
        )]))?;
        manager.write_terraform_variables(&Variables::from([(
            "namespace".to_owned(),
            "stratus".to_owned(),
        )]))?;
        manager.set_technique_state(AttackTechniqueState::Warm)?;
        manager.data_store().set("token", "redacted")?;
    }

    let directory = root.path().join(id);
    for name in [
        TERRAFORM_FILE_NAME,
        STATE_FILE_NAME,
        TERRAFORM_OUTPUTS_FILE_NAME,
        TERRAFORM_VARIABLES_FILE_NAME,
        DATA_STORE_FILE_NAME,
    ] {
        assert!(directory.join(name).is_file(), "{name} missing");
    }

    let mut reopened = FileSystemStateManager::new(root.path(), id)?;
    assert_eq!(reopened.technique_state(), AttackTechniqueState::Warm);
    assert_eq!(reopened.terraform_outputs()?["pod_name"], "stratus-pod");
    assert_eq!(reopened.terraform_variables()?["namespace"], "stratus");
    assert_eq!(reopened.data_store().get("token")?, "redacted");
    Ok(())
}

#[test]
fn techniques_do_not_share_files() -> anyhow::Result<()> {
    let root = tempdir()?;
    let first = FileSystemStateManager::new(root.path(), "aws.one")?;
    let mut second = FileSystemStateManager::new(root.path(), "aws.two")?;

    first.set_technique_state(AttackTechniqueState::Detonated)?;
    second.set_technique_state(AttackTechniqueState::Warm)?;
    second.cleanup_technique()?;

    assert_eq!(first.technique_state(), AttackTechniqueState::Detonated);
    assert_eq!(second.technique_state(), AttackTechniqueState::Cold);
    assert_eq!(
        fs::read_to_string(root.path().join("aws.one").join(STATE_FILE_NAME))?,
        "DETONATED"
    );
    Ok(())
}
