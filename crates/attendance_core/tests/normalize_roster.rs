use attendance_core::{normalize_roster, Grade, RosterEntry, TimeSlot};

fn ids_and_periods(entries: &[RosterEntry], slot: TimeSlot) -> Vec<(String, Grade, Vec<u8>)> {
    normalize_roster(entries, slot)
        .records
        .into_iter()
        .map(|record| {
            (
                record.student_id.to_string(),
                record.grade,
                record.periods.to_vec(),
            )
        })
        .collect()
}

#[test]
fn single_grade_course_in_morning_window() {
    let outcome = normalize_roster(
        &[RosterEntry::new(
            "[2학년 국제교육부 수목 1,2교시]",
            "김민서(21202), 최진성(21220)",
        )],
        TimeSlot::Morning,
    );

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].name, "김민서");
    assert_eq!(outcome.records[1].name, "최진성");
    for record in &outcome.records {
        assert_eq!(record.grade, Grade::Second);
        assert_eq!(record.periods.to_vec(), vec![1, 2]);
    }
}

#[test]
fn common_course_resolves_grade_from_id_prefix() {
    let records = ids_and_periods(
        &[RosterEntry::new(
            "[1+2학년 전체 5,6교시]",
            "김지몽(10911), 김민서(21202)",
        )],
        TimeSlot::Afternoon,
    );

    assert_eq!(
        records,
        vec![
            ("10911".to_string(), Grade::First, vec![5, 6]),
            ("21202".to_string(), Grade::Second, vec![5, 6]),
        ]
    );
}

#[test]
fn duplicate_sightings_union_their_periods() {
    let records = ids_and_periods(
        &[
            RosterEntry::new("[1학년 국어과 매일 1,2교시]", "김지몽(10911)"),
            RosterEntry::new("[1학년 수학과 매일 3,4교시]", "김지몽(10911)"),
            RosterEntry::new("[1학년 영어과 매일 2,3교시]", "김지몽(10911)"),
        ],
        TimeSlot::Morning,
    );

    assert_eq!(records, vec![("10911".to_string(), Grade::First, vec![1, 2, 3, 4])]);
}

#[test]
fn rows_outside_window_or_without_periods_are_dropped() {
    let outcome = normalize_roster(
        &[
            RosterEntry::new("[2학년 국제교육부 수목 7,8교시]", "김민서(21202)"),
            RosterEntry::new("[2학년 자율학습]", "최진성(21220)"),
            RosterEntry::new("[2학년 과학 4,5교시]", "  "),
            RosterEntry::new("[2학년 과학 4,5교시]", "이서연(21105)"),
        ],
        TimeSlot::Morning,
    );

    assert_eq!(outcome.dropped_entries, 3);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].student_id.as_str(), "21105");
    assert_eq!(outcome.records[0].periods.to_vec(), vec![4]);
}

#[test]
fn specific_grade_course_never_leaks_across_grades() {
    let records = ids_and_periods(
        &[RosterEntry::new(
            "[1학년 국어과 매일 1,2교시]",
            "김지몽(10911), 김민서(21202)",
        )],
        TimeSlot::Morning,
    );

    assert_eq!(records, vec![("10911".to_string(), Grade::First, vec![1, 2])]);
}

#[test]
fn roster_rows_deserialize_from_extractor_json() {
    let entries: Vec<RosterEntry> = serde_json::from_str(
        r#"[{"course_descriptor": "[2학년 국제교육부 수목 1,2교시]",
             "student_list_text": "김민서(21202)"}]"#,
    )
    .unwrap();

    assert_eq!(
        ids_and_periods(&entries, TimeSlot::Morning),
        vec![("21202".to_string(), Grade::Second, vec![1, 2])]
    );
}

#[test]
fn demo_roster_aggregates_per_slot() {
    let entries: Vec<RosterEntry> =
        serde_json::from_str(include_str!("../../../demos/roster.json")).unwrap();

    let morning = ids_and_periods(&entries, TimeSlot::Morning);
    assert_eq!(morning.len(), 3);

    let afternoon = ids_and_periods(&entries, TimeSlot::Afternoon);
    assert_eq!(
        afternoon,
        vec![
            ("10911".to_string(), Grade::First, vec![5, 6]),
            ("21202".to_string(), Grade::Second, vec![5, 6]),
        ]
    );
}
