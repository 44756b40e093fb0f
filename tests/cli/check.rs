use anyhow::Result;

use crate::{CliTest, DATABASE, HEADER, SOURCE, stderr, stdout};

#[test]
fn test_check_writes_nothing() -> Result<()> {
    let test = CliTest::with_file("src/main.cpp", "void f() { SPGM(Hello, \"Hello\"); }\n")?;

    let output = test.check_command().output()?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Checked 1 source file, 1 string"));
    assert!(!test.exists(HEADER));
    assert!(!test.exists(SOURCE));
    assert!(!test.exists(DATABASE));

    Ok(())
}

#[test]
fn test_check_fails_on_errors() -> Result<()> {
    let test = CliTest::with_file(
        "src/main.cpp",
        "void f() { SPGM(Hello, \"Hello\"); SPGM(Hello, \"Hi\"); }\n",
    )?;

    let output = test.check_command().output()?;

    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    assert!(stdout.contains("conflict"));
    assert!(stdout.contains("1 problems (1 error, 0 warnings)"));

    Ok(())
}

#[test]
fn test_check_after_generate_uses_cache() -> Result<()> {
    let test = CliTest::with_file("src/main.cpp", "void f() { SPGM(Hello, \"Hello\"); }\n")?;
    test.generate_command().output()?;
    let database = test.read_file(DATABASE)?;

    let output = test.check_command().arg("-v").output()?;

    assert!(output.status.success());
    assert!(!stderr(&output).contains("scanning src/main.cpp"));
    assert_eq!(test.read_file(DATABASE)?, database);

    Ok(())
}

#[test]
fn test_invalid_config_is_an_internal_error() -> Result<()> {
    let test = CliTest::with_file(".spgmrc.json", r#"{ "symbolPrefix": "1bad" }"#)?;

    let output = test.check_command().output()?;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("symbolPrefix"));

    Ok(())
}

#[test]
fn test_corrupt_database_is_an_internal_error() -> Result<()> {
    let test = CliTest::with_file("src/main.cpp", "void f() { SPGM(Hello, \"Hello\"); }\n")?;
    test.write_file(DATABASE, "{ not json")?;

    let output = test.check_command().output()?;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Failed to parse database"));

    Ok(())
}
