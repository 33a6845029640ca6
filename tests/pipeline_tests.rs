// tests/pipeline_tests.rs - Batch behavior: filtering, ordinals, diagnostics

use txtab::{
    Currency, DropReason, PipelineConfig, TransactionPipeline,
};

fn pipeline() -> TransactionPipeline {
    TransactionPipeline::new(PipelineConfig::default())
}

#[test]
fn test_worked_example_record() {
    let output = pipeline()
        .parse_from_text("2023-05-14 14:05:31::user123::top-up::500::ATM Location::Device");
    assert_eq!(output.dataset.len(), 1);

    let record = &output.dataset.records[0];
    assert_eq!(record.row_id, 1);
    assert_eq!(
        record.original_log,
        "2023-05-14 14:05:31::user123::top-up::500::ATM Location::Device"
    );
    assert_eq!(record.datetime.unwrap().to_string(), "2023-05-14 14:05:31");
    assert_eq!(record.user_id.as_deref(), Some("user123"));
    assert_eq!(record.transaction_type.as_deref(), Some("top-up"));
    assert_eq!(record.amount, Some(500.0));
    assert_eq!(record.currency, Currency::Gbp);
    assert_eq!(record.location, "ATM Location");
    assert_eq!(record.device, "Device");
}

#[test]
fn test_sentinel_lines_never_reach_grammars() {
    let blob = "MALFORMED_LOG\n\"\"\nraw_log\n";
    let output = pipeline().parse_from_text(blob);
    assert!(output.dataset.is_empty());
    assert_eq!(output.diagnostics.lines_seen, 0);
    assert!(output.diagnostics.dropped.is_empty());
}

#[test]
fn test_empty_blob_yields_empty_dataset() {
    let output = pipeline().parse_from_text("");
    assert!(output.dataset.is_empty());
    assert_eq!(output.diagnostics.records_parsed, 0);
}

#[test]
fn test_row_ids_follow_the_filtered_sequence() {
    let blob = "\
raw_log
MALFORMED_LOG
2023-05-14 14:05:31::user123::top-up::500::ATM Location::Device
garbage that matches nothing
usr:user9|refund|€25|Milan|2023-05-15 10:00:00|Tablet
";
    let output = pipeline().parse_from_text(blob);

    // Sentinels consume no ordinal; the dropped middle line does.
    assert_eq!(output.diagnostics.lines_seen, 3);
    assert_eq!(output.dataset.len(), 2);
    assert_eq!(output.dataset.records[0].row_id, 1);
    assert_eq!(output.dataset.records[1].row_id, 3);

    assert_eq!(output.diagnostics.dropped.len(), 1);
    let dropped = &output.diagnostics.dropped[0];
    assert_eq!(dropped.row_id, 2);
    assert_eq!(dropped.snippet, "garbage that matches nothing");
    assert_eq!(dropped.reason, DropReason::NoGrammarMatched);
}

#[test]
fn test_one_bad_line_never_aborts_the_batch() {
    let mut blob = String::new();
    for i in 0..500 {
        blob.push_str(&format!(
            "2023-05-14 14:05:31::user{}::top-up::{}::Somewhere::Device\n",
            i, i
        ));
        if i == 250 {
            blob.push_str("user1 2023-05-14 14:05:31 transfer 12.34.56 Leeds Phone\n");
        }
    }
    let output = pipeline().parse_from_text(&blob);
    assert_eq!(output.dataset.len(), 500);
    assert_eq!(output.diagnostics.dropped.len(), 1);
    match &output.diagnostics.dropped[0].reason {
        DropReason::ExtractionFailed { grammar, message } => {
            assert_eq!(grammar, "positional");
            assert!(message.contains("12.34.56"));
        }
        other => panic!("expected extraction failure, got {:?}", other),
    }
}

#[test]
fn test_unparseable_datetime_is_null_not_fatal() {
    // The usr-pipe layout anchors the timestamp shape, so push a bad
    // calendar value through the double-colon layout instead.
    let output =
        pipeline().parse_from_text("2023-99-99 14:05:31::user1::top-up::500::Loc::Dev");
    // Shape `\d{4}-\d{2}-\d{2}` still matches 2023-99-99; chrono rejects it.
    assert_eq!(output.dataset.len(), 1);
    assert_eq!(output.dataset.records[0].datetime, None);
    assert_eq!(output.dataset.records[0].amount, Some(500.0));
}

#[test]
fn test_parsing_is_idempotent() {
    let blob = "\
2023-05-14 14:05:31::user123::top-up::500::ATM Location::Device
unmatched junk line
14/05/2023 08:00:00 ::: user5 *** REFUND ::: amt:12.50€ @ Paris <Phone>
";
    let first = pipeline().parse_from_text(blob);
    let second = pipeline().parse_from_text(blob);
    assert_eq!(first.dataset, second.dataset);
    assert_eq!(first.diagnostics.dropped, second.diagnostics.dropped);
}

#[test]
fn test_parallel_mode_matches_sequential_output() {
    let mut blob = String::new();
    for i in 0..200 {
        match i % 4 {
            0 => blob.push_str(&format!(
                "2023-05-14 14:05:31::user{}::top-up::{}::Loc {}::Dev\n",
                i, i, i
            )),
            1 => blob.push_str(&format!(
                "usr:user{}|refund|€{}.25|Milan|2023-05-15 10:00:00|Tablet\n",
                i, i
            )),
            2 => blob.push_str("line that matches no layout\n"),
            _ => blob.push_str(&format!(
                "user{} 2023-05-14 14:05:31 transfer {} Leeds Phone\n",
                i, i
            )),
        }
    }

    let sequential = pipeline().parse_from_text(&blob);
    let parallel = TransactionPipeline::new(PipelineConfig {
        parallel: true,
        ..PipelineConfig::default()
    })
    .parse_from_text(&blob);

    assert_eq!(sequential.dataset, parallel.dataset);
    assert_eq!(sequential.diagnostics.dropped, parallel.diagnostics.dropped);
}

#[test]
fn test_missing_source_is_the_only_fatal_input_error() {
    let err = pipeline().parse_from_source(None, None).unwrap_err();
    assert!(err.to_string().contains("input path or raw text"));

    let ok = pipeline().parse_from_source(None, Some("")).unwrap();
    assert!(ok.dataset.is_empty());
}

#[test]
fn test_parse_from_path_round_trip() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "2023-05-14 14:05:31::user123::top-up::500::ATM Location::Device"
    )
    .unwrap();
    writeln!(file, "MALFORMED_LOG").unwrap();

    let output = pipeline().parse_from_path(file.path()).unwrap();
    assert_eq!(output.dataset.len(), 1);
    assert_eq!(output.diagnostics.lines_seen, 1);
}

#[test]
fn test_parse_from_missing_path_is_fatal() {
    let err = pipeline()
        .parse_from_path(std::path::Path::new("/nonexistent/txtab-input.log"))
        .unwrap_err();
    assert!(err.to_string().contains("IO error"));
}

#[test]
fn test_snippet_is_truncated_in_diagnostics() {
    let long_junk = format!("???{}", "x".repeat(400));
    let output = pipeline().parse_from_text(&long_junk);
    assert_eq!(output.diagnostics.dropped.len(), 1);
    assert_eq!(output.diagnostics.dropped[0].snippet.chars().count(), 100);
}

#[test]
fn test_pipeline_exposes_injected_registry() {
    use txtab::GrammarRegistry;

    let custom = TransactionPipeline::with_registry(
        GrammarRegistry::standard(),
        PipelineConfig::default(),
    );
    assert_eq!(custom.registry().len(), 9);
}

#[test]
fn test_dataset_schema_shape() {
    use txtab::Dataset;

    let names: Vec<&str> = Dataset::schema().iter().map(|(name, _)| *name).collect();
    assert_eq!(
        names,
        vec![
            "row_id",
            "original_log",
            "datetime",
            "user_id",
            "transaction_type",
            "amount",
            "currency",
            "location",
            "device"
        ]
    );
}
