//! End-to-end: CSV files in, engine runs, CSV/JSONL out.

use std::fs;
use std::path::Path;

use emjoin_core::config::EngineConfig;
use emjoin_exec::Engine;
use emjoin_io::writers::{CsvWriter, JsonlWriter};
use emjoin_operators::{JoinInputs, JoinType};

const EMPLOYEES: &str = "\
id,name,dept
1,ada,10
2,grace,20
3,linus,10
4,ken,
5,barbara,30
6,dennis,20
7,edsger,10
";

const DEPTS: &str = "\
dept_id,title
10,compilers
20,systems
20,kernels
40,databases
";

fn write_inputs(dir: &Path) {
    fs::write(dir.join("emp.csv"), EMPLOYEES).unwrap();
    fs::write(dir.join("dept.csv"), DEPTS).unwrap();
}

fn engine(buffers: usize, spill_uri: Option<String>, spill_dir: &Path) -> Engine {
    Engine::new(EngineConfig {
        num_buffers: buffers,
        records_per_page: 2,
        spill_dir: spill_dir.to_string_lossy().to_string(),
        spill_uri,
        ..EngineConfig::default()
    })
    .unwrap()
}

fn join_csv(engine: &Engine, join_type: JoinType) -> (Vec<String>, emjoin_exec::RunReport) {
    let schema = engine
        .store()
        .schema("emp")
        .unwrap()
        .join(&engine.store().schema("dept").unwrap());
    let mut sink = CsvWriter::to_writer(Vec::new(), &schema).unwrap();
    let report = engine
        .run_join(
            join_type,
            JoinInputs::new("emp", "dept", "dept", "dept_id"),
            &mut sink,
        )
        .unwrap();
    let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    (text.lines().map(str::to_string).collect(), report)
}

#[test]
fn test_csv_join_pipeline_all_strategies() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let engine = engine(3, Some("memory://".into()), dir.path());
    let emp = engine.load_csv("emp", dir.path().join("emp.csv")).unwrap();
    engine.load_csv("dept", dir.path().join("dept.csv")).unwrap();
    assert_eq!(emp.records, 7);
    assert_eq!(emp.pages, 4);

    let mut baseline: Option<Vec<String>> = None;
    for join_type in JoinType::ALL {
        let (lines, report) = join_csv(&engine, join_type);
        assert_eq!(lines[0], "id,name,dept,dept_id,title");
        // 3 employees in dept 10, 2 in dept 20 matching 2 titles each.
        assert_eq!(report.output_records, 7, "{join_type}");
        assert_eq!(report.strategy.as_deref(), Some(join_type.short_name()));
        assert!(report.peak_pages <= 3);
        assert!(!lines.iter().any(|l| l.starts_with("4,")));

        let mut body = lines[1..].to_vec();
        body.sort();
        match &baseline {
            Some(expected) => assert_eq!(&body, expected, "{join_type}"),
            None => baseline = Some(body),
        }
    }
    assert_eq!(engine.store().tables().unwrap(), vec!["dept", "emp"]);
}

#[test]
fn test_csv_sort_pipeline_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let spill = dir.path().join("spill");
    let engine = engine(3, None, &spill);
    let loaded = engine.load_csv("emp", dir.path().join("emp.csv")).unwrap();

    let mut buf = Vec::new();
    let report = {
        let mut sink = JsonlWriter::to_writer(&mut buf, &loaded.schema);
        engine.run_sort("emp", "name", &mut sink).unwrap()
    };
    let names: Vec<String> = String::from_utf8(buf)
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["name"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        names,
        vec!["ada", "barbara", "dennis", "edsger", "grace", "ken", "linus"]
    );

    let stats = report.sort.expect("sort stats");
    assert_eq!(stats.initial_runs, 2);
    assert_eq!(stats.merge_passes, 1);
    assert_eq!(engine.store().tables().unwrap(), vec!["emp"]);

    // A second run produces the same bytes.
    let mut again = Vec::new();
    let second = {
        let mut sink = JsonlWriter::to_writer(&mut again, &loaded.schema);
        engine.run_sort("emp", "name", &mut sink).unwrap()
    };
    assert_eq!(second.output_digest, report.output_digest);
}

#[test]
fn test_engine_from_json_config() {
    let cfg = EngineConfig::from_json_str(
        r#"{"num_buffers": 4, "records_per_page": 3, "spill_uri": "memory://"}"#,
    )
    .unwrap();
    assert_eq!(cfg.page_codec, "none");
    let engine = Engine::new(cfg).unwrap();
    engine
        .create_table(
            "t",
            emjoin_core::schema::Schema::new(vec![emjoin_core::schema::Field::new(
                "k",
                emjoin_core::schema::DataType::Int64,
                false,
            )]),
            std::iter::empty(),
        )
        .unwrap();
    assert_eq!(engine.store().page_count("t").unwrap(), 0);

    let bad = EngineConfig::from_json_str(r#"{"num_buffers": 2}"#).and_then(|c| {
        c.validate()?;
        Ok(c)
    });
    assert!(bad.is_err());
}
