use anyhow::Result;

use crate::{CliTest, stderr, stdout};

const SOURCE: &str = r#"void f() {
    SPGM(Wifi_Ssid, "SSID", de: "Netzwerk");
    SPGM(Wifi_Pass, "Password");
    SPGM(Mqtt_Host, "Host");
}
"#;

fn generated() -> Result<CliTest> {
    let test = CliTest::with_file("src/main.cpp", SOURCE)?;
    let output = test.generate_command().output()?;
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    Ok(test)
}

#[test]
fn test_query_matches_with_prefix() -> Result<()> {
    let test = generated()?;

    let output = test.query_command().arg("SPGM_Wifi_*").output()?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("SPGM_Wifi_Ssid  auto  used 1x"));
    assert!(stdout.contains("  de: \"Netzwerk\"  (src/main.cpp:2:5)"));
    assert!(stdout.contains("SPGM_Wifi_Pass"));
    assert!(!stdout.contains("Mqtt_Host"));
    assert!(stdout.contains("2 identifiers matched"));

    Ok(())
}

#[test]
fn test_query_auto_init_lines() -> Result<()> {
    let test = generated()?;

    let output = test
        .query_command()
        .args(["Wifi_Ssid", "--auto-init"])
        .output()?;

    assert_eq!(
        stdout(&output),
        "AUTO_STRING_DEF(Wifi_Ssid, \"SSID\", de: \"Netzwerk\")\n"
    );

    Ok(())
}

#[test]
fn test_query_without_matches() -> Result<()> {
    let test = generated()?;

    let output = test.query_command().arg("Nothing*").output()?;

    assert!(output.status.success());
    assert!(stdout(&output).contains("No identifiers match \"Nothing*\""));

    Ok(())
}

#[test]
fn test_query_without_database() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.query_command().output()?;

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("run `spgm generate` first"));

    Ok(())
}
