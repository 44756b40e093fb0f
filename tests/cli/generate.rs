use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::{CliTest, DATABASE, HEADER, SOURCE, stderr, stdout};

const MAIN_CPP: &str = r#"#include "generated/spgm_auto_strings.h"

void setup() {
    Serial.println(FSPGM(Hello_World, "Hello World"));
    Serial.println(SPGM(Currency, "%.2f", de;bg: "%.2fEUR", en-US: "$%.2f"));
}
"#;

#[test]
fn test_generate_writes_outputs_and_database() -> Result<()> {
    let test = CliTest::with_file("src/main.cpp", MAIN_CPP)?;
    test.write_file("src/net.cpp", "void net() { log(SPGM(Hello_World)); }\n")?;

    let output = test.generate_command().output()?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Generated from 2 source files, 2 strings"));

    let header = test.read_file(HEADER)?;
    assert!(header.contains("#pragma once"));
    assert!(header.contains("SPGM_Hello_World"));
    assert!(header.contains("SPGM_Currency"));

    let source = test.read_file(SOURCE)?;
    assert!(source.contains("\"Hello World\""));
    assert!(source.contains("\"%.2fEUR\""));
    assert_eq!(source.matches("\"Hello World\"").count(), 1);

    let database: Value = serde_json::from_str(&test.read_file(DATABASE)?)?;
    assert_eq!(database["version"], 1);
    assert_eq!(database["entries"][0]["identifier"], "Hello_World");
    assert_eq!(database["entries"][0]["usageCount"], 2);
    assert!(database["files"]["src/main.cpp"]["hash"].is_string());

    Ok(())
}

#[test]
fn test_generate_is_deterministic_and_idempotent() -> Result<()> {
    let test = CliTest::with_file("src/main.cpp", MAIN_CPP)?;

    test.generate_command().output()?;
    let header = test.read_file(HEADER)?;
    let source = test.read_file(SOURCE)?;

    let output = test.generate_command().output()?;
    assert!(output.status.success());
    assert!(stdout(&output).contains("outputs up to date"));
    assert_eq!(test.read_file(HEADER)?, header);
    assert_eq!(test.read_file(SOURCE)?, source);

    let output = test.generate_command().arg("--force").output()?;
    assert!(output.status.success());
    assert_eq!(test.read_file(SOURCE)?, source);

    Ok(())
}

#[test]
fn test_conflict_fails_without_writing() -> Result<()> {
    let test = CliTest::with_file(
        "src/a.cpp",
        "PROGMEM_STRING_DEF(Title, \"Alpha\");\nvoid a() { SPGM(Title); }\n",
    )?;
    test.write_file("src/b.cpp", "void b() { SPGM(Title, \"Beta\"); }\n")?;

    let output = test.generate_command().output()?;

    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    assert!(stdout.contains("error: \"Title\"  conflict"));
    assert!(stdout.contains("--> src/b.cpp:1:12"));
    assert!(stdout.contains("defined at src/a.cpp:1:1"));
    assert!(!test.exists(HEADER));
    assert!(!test.exists(SOURCE));
    assert!(!test.exists(DATABASE));

    Ok(())
}

#[test]
fn test_locale_conflict_reports_locale() -> Result<()> {
    let test = CliTest::with_file(
        "src/a.cpp",
        "void a() { SPGM(Currency, \"%.2f\", de: \"%.2fEUR\"); }\n",
    )?;
    test.write_file(
        "src/b.cpp",
        "void b() { SPGM(Currency, \"%.2f\", de: \"EUR%.2f\"); }\n",
    )?;

    let output = test.generate_command().output()?;

    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    assert!(stdout.contains("\"Currency (de)\"  locale-conflict"));
    assert!(stdout.contains("de: \"EUR%.2f\" differs from \"%.2fEUR\" defined at src/a.cpp:1:12"));

    Ok(())
}

#[test]
fn test_unresolved_reference_fails() -> Result<()> {
    let test = CliTest::with_file("src/main.cpp", "void f() { SPGM(Missing); }\n")?;

    let output = test.generate_command().output()?;

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("unresolved-reference"));
    assert!(!test.exists(HEADER));

    Ok(())
}

#[test]
fn test_unused_definition_is_a_warning() -> Result<()> {
    let test = CliTest::with_file(
        "src/main.cpp",
        "PROGMEM_STRING_DEF(Spare, \"spare\");\nvoid f() { SPGM(Used, \"used\"); }\n",
    )?;

    let output = test.generate_command().output()?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("warning: \"Spare\"  unused-definition"));
    let source = test.read_file(SOURCE)?;
    assert!(source.contains("\"used\""));
    assert!(!source.contains("\"spare\""));

    Ok(())
}

#[test]
fn test_parse_error_points_at_source_line() -> Result<()> {
    let test = CliTest::with_file(
        "src/main.cpp",
        "void f() {\n    SPGM(Broken, \"unterminated);\n}\n",
    )?;

    let output = test.generate_command().output()?;

    assert_eq!(output.status.code(), Some(1));
    let stdout = stdout(&output);
    assert!(stdout.contains("parse-error"));
    assert!(stdout.contains("--> src/main.cpp:2:5"));
    assert!(stdout.contains("2 |     SPGM(Broken, \"unterminated);"));

    Ok(())
}

#[test]
fn test_removed_strings_are_pruned() -> Result<()> {
    let test = CliTest::with_file(
        "src/main.cpp",
        "void f() { SPGM(Keep, \"keep\"); SPGM(Drop, \"drop\"); }\n",
    )?;
    test.generate_command().output()?;
    assert!(test.read_file(SOURCE)?.contains("\"drop\""));

    test.write_file("src/main.cpp", "void f() { SPGM(Keep, \"keep\"); }\n")?;
    let output = test.generate_command().output()?;

    assert!(output.status.success());
    assert!(!test.read_file(SOURCE)?.contains("\"drop\""));
    assert!(!test.read_file(DATABASE)?.contains("\"Drop\""));

    Ok(())
}

#[test]
fn test_define_supplies_value() -> Result<()> {
    let test = CliTest::with_file(
        "src/main.cpp",
        "PROGMEM_STRING_DEF(Product, PRODUCT_NAME);\nvoid f() { SPGM(Product); }\n",
    )?;

    let output = test
        .generate_command()
        .args(["-D", "PRODUCT_NAME=\"Widget 3000\""])
        .output()?;

    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(test.read_file(SOURCE)?.contains("\"Widget 3000\""));

    Ok(())
}

#[test]
fn test_config_overrides_paths_and_strings() -> Result<()> {
    let test = CliTest::with_file(
        "firmware/app.ino",
        "void loop() { Serial.print(FSPGM(Banner)); }\n",
    )?;
    test.write_file(
        ".spgmrc.json",
        r#"{
  "includes": ["firmware"],
  "outputDir": "firmware/gen",
  "database": "build/strings.json",
  "strings": { "Banner": { "default": "Welcome", "locales": { "de": "Willkommen" } } }
}"#,
    )?;

    let output = test.generate_command().output()?;

    assert!(output.status.success(), "stdout: {}", stdout(&output));
    let source = test.read_file("firmware/gen/spgm_auto_strings.cpp")?;
    assert!(source.contains("\"Welcome\""));
    assert!(source.contains("\"Willkommen\""));
    assert!(test.exists("build/strings.json"));
    assert!(!test.exists(DATABASE));

    Ok(())
}

#[test]
fn test_compact_format() -> Result<()> {
    let test = CliTest::with_file("src/main.cpp", "void f() { SPGM(Missing); }\n")?;

    let output = test
        .generate_command()
        .args(["--format", "compact"])
        .output()?;

    assert_eq!(
        stdout(&output),
        "src/main.cpp:1:12: error[unresolved-reference]: Missing\n"
    );

    Ok(())
}

#[test]
fn test_auto_init_block_is_generated() -> Result<()> {
    let test = CliTest::with_file(
        "src/boot.cpp",
        r#"FLASH_STRING_GENERATOR_AUTO_INIT(
    AUTO_STRING_DEF(Boot_Msg, "Booting", de: "Startet"),
    AUTO_STRING_DEF(Ready_Msg, "Ready")
);
"#,
    )?;

    let output = test.generate_command().output()?;

    assert!(output.status.success(), "stdout: {}", stdout(&output));
    let source = test.read_file(SOURCE)?;
    let boot = source.find("\"Boot_Msg\"").unwrap();
    let ready = source.find("\"Ready_Msg\"").unwrap();
    assert!(boot < ready);
    assert!(source.contains("spgm_auto_init_strings[]"));

    Ok(())
}

#[test]
fn test_strings_inside_define_bodies_are_generated() -> Result<()> {
    let test = CliTest::with_file(
        "src/main.cpp",
        r#"#define TITLE FSPGM(Title, "Title")
#define LABEL(id) FSPGM(id)

void f() { print(TITLE); print(LABEL(Title)); }
"#,
    )?;

    let output = test.generate_command().output()?;

    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(test.read_file(HEADER)?.contains("SPGM_Title"));
    assert!(test.read_file(SOURCE)?.contains("\"Title\""));

    Ok(())
}

#[test]
fn test_concatenated_escapes_keep_their_bytes() -> Result<()> {
    let test = CliTest::with_file(
        "src/main.cpp",
        r#"PROGMEM_STRING_DEF(Bytes, "\x4" "1");
void f() { SPGM(Bytes); }
"#,
    )?;

    let output = test.generate_command().output()?;

    assert!(output.status.success(), "stdout: {}", stdout(&output));
    let source = test.read_file(SOURCE)?;
    assert!(source.contains(r#""\x4" "1""#));
    assert!(!source.contains(r#""\x41""#));

    Ok(())
}

#[test]
fn test_auto_init_blocks_follow_file_order() -> Result<()> {
    let test = CliTest::with_file(
        "src/b.cpp",
        "FLASH_STRING_GENERATOR_AUTO_INIT(\n    AUTO_STRING_DEF(B_First, \"b\")\n);\n",
    )?;
    test.write_file(
        "src/a/x.cpp",
        "FLASH_STRING_GENERATOR_AUTO_INIT(\n    AUTO_STRING_DEF(A_First, \"a\"),\n    AUTO_STRING_DEF(A_Second, \"a2\")\n);\n",
    )?;
    test.write_file(
        "src/a/nested/y.cpp",
        "AUTO_STRING_DEF(Nested, \"n\")\n",
    )?;

    let output = test.generate_command().output()?;

    assert!(output.status.success(), "stdout: {}", stdout(&output));
    let source = test.read_file(SOURCE)?;
    let positions: Vec<usize> = ["\"Nested\"", "\"A_First\"", "\"A_Second\"", "\"B_First\""]
        .iter()
        .map(|id| source.find(id).unwrap())
        .collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "unexpected order: {positions:?}"
    );

    Ok(())
}
