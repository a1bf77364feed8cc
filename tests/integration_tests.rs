use ficha_financeira::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs;
use std::path::Path;

const FICHA_2024: &str = "\
EMPRESA EXEMPLO LTDA                         FICHA FINANCEIRA
Funcionario: 896 APARECIDA DA SILVA          Admissao: 01/03/2020
Codigo Descricao 01/2024 02/2024 03/2024
1-Horas Normais 180,00 200,00 0,00
40-Faltas - 5,00 -
150-Hora Extra 50% 10,00 - -
200-Hora Extra 100% - 5,00 -
8-Insalubridade 484,80 484,80 484,80
174-Ferias 2.000,00 - 3.000,00
527-INSS-Comp 3.000,00 3.000,00 4.000,00
527-INSS-Valor 300,00 300,00 360,00
\u{c}EMPRESA EXEMPLO LTDA                         FICHA FINANCEIRA
Codigo Descricao 04/2024 05/2024 06/2024
1-Horas Normais 190,00 - 200,00
902-AFAST. DOENCA - 10,00 -
8-Insalubridade 484,80 506,00 506,00
527-INSS-Comp 3.000,00 3.000,00 3.000,00
527-INSS-Valor 300,00 300,00 300,00
";

fn p(year: i32, month: u32) -> Period {
    Period::new(year, month).unwrap()
}

fn map(entries: &[(i32, u32, Decimal)]) -> PeriodMap {
    entries
        .iter()
        .map(|(year, month, value)| (p(*year, *month), *value))
        .collect()
}

fn write_input(dir: &Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("ficha.txt");
    fs::write(&path, text).unwrap();
    path
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn test_full_document_produces_every_report() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), FICHA_2024);
    let out = dir.path().join("saida");

    let summary = process_ficha_financeira(&input, &out)?;

    assert_eq!(summary.periods, Period::range(p(2024, 1), p(2024, 6)));
    assert_eq!(summary.files.len(), 4);
    for file in &summary.files {
        assert!(file.exists(), "{} missing", file.display());
    }

    let horas = read(&out, "HORAS TRABALHADAS.csv");
    assert_eq!(
        horas,
        "PERIODO;HORAS TRAB.;FALTAS;SALDO HORAS;902-AFAST. DOENCA;DIAS TRABALHADOS;DIAS FERIAS\n\
         01/2024;200;0;200;0;27;3\n\
         02/2024;200;5;195;0;;\n\
         03/2024;200;0;200;0;0;30\n\
         04/2024;200;0;200;0;28;2\n\
         05/2024;190;0;190;10;0;30\n\
         06/2024;200;0;200;0;;\n"
    );

    let cartoes = read(&out, "CARTOES.csv");
    assert_eq!(
        cartoes.lines().collect::<Vec<_>>(),
        vec![
            "PERIODO;HORA EXTRA 50%;HORA EXTRA 100%",
            "01/2024;10;0",
            "02/2024;0;5",
            "03/2024;0;0",
            "04/2024;0;0",
            "05/2024;0;0",
            "06/2024;0;0",
        ]
    );

    let insalubridade = read(&out, "INSALUBRIDADE.csv");
    assert_eq!(insalubridade.lines().count(), 7);
    assert!(insalubridade.contains("05/2024;506;N;N;N;N\n"));

    let base = read(&out, "BASE INSS FERIAS.csv");
    assert_eq!(
        base,
        "MES_ANO;VALOR;FGTS;FGTS_REC.;CONTRIBUICAO_SOCIAL;CONTRIBUICAO_SOCIAL_REC.\n\
         01/2024;10;N;N;N;N\n\
         03/2024;9;N;N;N;N\n"
    );

    Ok(())
}

#[test]
fn test_month_absent_from_attendance_has_blank_split() -> anyhow::Result<()> {
    let data = AttendanceData {
        horas: map(&[(2024, 1, dec!(180))]),
        faltas: map(&[(2024, 9, dec!(3))]),
        meses_registrados: Some([p(2024, 1)].into_iter().collect()),
        ..Default::default()
    };
    let report = HoursReconciler::default().reconcile(&[p(2024, 1), p(2024, 9)], &data);

    assert_eq!(report.rows[1].period, p(2024, 9));
    assert_eq!(report.rows[1].balance, dec!(197));
    assert_eq!(report.rows[1].day_split, None);
    Ok(())
}

#[test]
fn test_vacation_rule_properties() {
    let mut ledger = Ledger::new();
    let jan = p(2024, 1);
    let feb = p(2024, 2);
    let mar = p(2024, 3);

    ledger.insert_source("174-Ferias", jan, dec!(2000));
    for code in ["167-Ferias", "168-Ferias", "173-Ferias", "174-Ferias"] {
        ledger.insert_source(code, feb, Decimal::ZERO);
    }
    for period in [jan, feb, mar] {
        ledger.insert_source("527-INSS-Comp", period, dec!(3000));
        ledger.insert_source("527-INSS-Valor", period, dec!(300));
    }

    apply_vacation_adjustments(&mut ledger);
    let once = ledger.clone();
    apply_vacation_adjustments(&mut ledger);

    assert_eq!(ledger, once);
    assert_eq!(ledger.value("3123-Base", jan), Some(dec!(10)));
    assert_eq!(ledger.value("3123-Base", feb), Some(dec!(10)));
    // no vacation pay recorded in March
    assert_eq!(ledger.value("3123-Base", mar), None);
}

#[test]
fn test_overtime_cards_fill_missing_with_zero() -> anyhow::Result<()> {
    let csv = render_overtime_report(
        &map(&[(2024, 1, dec!(10))]),
        &map(&[(2024, 2, dec!(5))]),
        &[p(2024, 1)],
    )?;
    assert_eq!(
        csv,
        "PERIODO;HORA EXTRA 50%;HORA EXTRA 100%\n01/2024;10;0\n02/2024;0;5\n"
    );
    Ok(())
}

#[test]
fn test_attendance_override_from_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), FICHA_2024);
    let attendance_path = dir.path().join("attendance.json");
    fs::write(
        &attendance_path,
        r#"{
            "horas": { "01/2024": "100" },
            "faltas": { "01/2024": "8" },
            "afastamentos": [
                { "label": "910-AFAST. MATERNIDADE", "values": { "01/2024": "20" }, "include": false }
            ]
        }"#,
    )?;
    let attendance = AttendanceData::from_json_path(&attendance_path)?;
    let out = dir.path().join("saida");

    FichaFinanceiraProcessor::new(ProcessorConfig::default())?.process_with_attendance(
        &input,
        &out,
        Some(attendance),
    )?;

    let horas = read(&out, "HORAS TRABALHADAS.csv");
    let lines: Vec<&str> = horas.lines().collect();
    assert_eq!(
        lines[0],
        "PERIODO;HORAS TRAB.;FALTAS;SALDO HORAS;910-AFAST. MATERNIDADE;DIAS TRABALHADOS;DIAS FERIAS"
    );
    assert_eq!(lines[1], "01/2024;200;8;192;20;15;15");
    // without a registration list only months with worked hours get a split
    assert_eq!(lines[2], "02/2024;200;0;200;0;;");
    Ok(())
}

#[test]
fn test_config_window_and_file_names() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), FICHA_2024);
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{
            "start_period": "02/2024",
            "end_period": "2024-03",
            "reconciler": { "reference_hours": "220" },
            "outputs": { "hours_report": "HORAS.csv", "vacation_base_report": null }
        }"#,
    )?;
    let out = dir.path().join("saida");

    let summary = process_with_config_file(&input, &out, &config_path)?;
    assert_eq!(summary.periods, vec![p(2024, 2), p(2024, 3)]);
    assert!(!out.join("BASE INSS FERIAS.csv").exists());

    let horas = read(&out, "HORAS.csv");
    // 200 worked hours no longer match the 220-hour reference
    assert_eq!(horas.lines().nth(1), Some("02/2024;220;5;215;0;27;3"));
    let insalubridade = read(&out, "INSALUBRIDADE.csv");
    assert_eq!(insalubridade.lines().count(), 3);
    Ok(())
}

#[test]
fn test_insalubridade_export_follows_configured_code() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_input(
        dir.path(),
        "\
Codigo Descricao 01/2024 02/2024
9-Insalubridade Grau Max 606,00 606,00
527-INSS-Comp 3.000,00 3.000,00
",
    );
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{
            "codes": { "insalubridade": "9-Insalubridade Grau Max" },
            "value_exports": [ { "code": "527-INSS-Comp", "filename": "INSS COMP.csv" } ]
        }"#,
    )?;
    let out = dir.path().join("saida");

    let summary = process_with_config_file(&input, &out, &config_path)?;

    let names: Vec<String> = summary
        .files
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "HORAS TRABALHADAS.csv",
            "CARTOES.csv",
            "INSALUBRIDADE.csv",
            "INSS COMP.csv"
        ]
    );
    assert_eq!(
        read(&out, "INSALUBRIDADE.csv").lines().nth(2),
        Some("02/2024;606;N;N;N;N")
    );
    assert!(read(&out, "INSS COMP.csv").contains("01/2024;3000;N;N;N;N"));
    Ok(())
}

#[test]
fn test_out_of_range_leave_hours_do_not_abort_the_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_input(
        dir.path(),
        "\
01/2024 02/2024
1-Horas Normais 200,00 180,00
902-AFAST. DOENCA 79.228.162.514.264.337.593.543.950.335- -
",
    );
    let out = dir.path().join("saida");

    let summary = process_ficha_financeira(&input, &out)?;
    assert_eq!(summary.periods, vec![p(2024, 1), p(2024, 2)]);

    assert_eq!(
        read(&out, "HORAS TRABALHADAS.csv"),
        "PERIODO;HORAS TRAB.;FALTAS;SALDO HORAS;902-AFAST. DOENCA;DIAS TRABALHADOS;DIAS FERIAS\n\
         02/2024;200;0;200;0;27;3\n"
    );
    Ok(())
}

#[test]
fn test_existing_files_are_overwritten() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), FICHA_2024);
    let out = dir.path().join("saida");
    fs::create_dir_all(&out)?;
    fs::write(out.join("CARTOES.csv"), "stale contents\n")?;

    process_ficha_financeira(&input, &out)?;

    assert!(read(&out, "CARTOES.csv").starts_with("PERIODO;HORA EXTRA 50%"));
    Ok(())
}

#[test]
fn test_failures_leave_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("saida");

    let missing = process_ficha_financeira(dir.path().join("nope.txt"), &out).unwrap_err();
    assert!(matches!(missing, FichaFinanceiraError::SourceNotFound(_)));

    let input = write_input(dir.path(), "Relatorio sem tabela\n");
    let unparseable = process_ficha_financeira(&input, &out).unwrap_err();
    assert!(matches!(unparseable, FichaFinanceiraError::ParseError(_)));

    assert!(!out.exists());
}

#[test]
fn test_ledger_keeps_source_and_derived_apart() -> anyhow::Result<()> {
    let processor = FichaFinanceiraProcessor::new(ProcessorConfig::default())?;
    let parsed = processor.build_ledger(&PlainText(FICHA_2024.to_string()))?;

    assert!(parsed.values.is_derived("3123-Base"));
    assert!(parsed.values.source_series("3123-Base").is_none());
    assert_eq!(parsed.values.value("8-Insalubridade", p(2024, 5)), Some(dec!(506)));
    assert_eq!(parsed.values.value("1-Horas Normais", p(2024, 5)), None);
    assert!(parsed.registered_periods.contains(&p(2024, 5)));
    Ok(())
}
