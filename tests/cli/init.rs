use anyhow::{Context, Result};
use serde_json::Value;

use crate::{CliTest, HEADER, stderr, stdout};

/// Validates config file structure and default values.
fn assert_config_content(content: &str) -> Result<()> {
    let parsed: Value = serde_json::from_str(content).context("Config should be valid JSON")?;

    for field in ["includes", "outputDir", "database", "symbolPrefix", "defines"] {
        assert!(parsed.get(field).is_some(), "Config should have '{}' field", field);
    }
    assert_eq!(parsed["symbolPrefix"], "SPGM_");

    assert!(
        content.contains("\n  \""),
        "Config should use 2-space indentation"
    );

    Ok(())
}

#[test]
fn test_init_creates_config() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().arg("init").output()?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Created .spgmrc.json"));
    assert!(test.root().join(".spgmrc.json").exists());
    assert_config_content(&test.read_file(".spgmrc.json")?)?;

    Ok(())
}

#[test]
fn test_init_fails_if_exists() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file(".spgmrc.json", "{}")?;

    let output = test.command().arg("init").output()?;

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains(".spgmrc.json already exists"));
    assert_eq!(test.read_file(".spgmrc.json")?, "{}");

    Ok(())
}

#[test]
fn test_init_config_is_immediately_usable() -> Result<()> {
    let test = CliTest::new()?;
    test.command().arg("init").output()?;
    test.write_file("src/main.cpp", "void f() { SPGM(Hello, \"Hello\"); }\n")?;

    let output = test.generate_command().output()?;

    assert!(
        output.status.success(),
        "Generate should work with initialized config. stdout: {}",
        stdout(&output)
    );
    assert!(test.exists(HEADER));

    Ok(())
}
