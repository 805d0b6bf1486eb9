//! Built-in chart catalog
//!
//! Incidence, mortality, screening, survival and delay charts computed from
//! the CSV files a simulation run writes.

use super::preprocess::{
    age_group_index, age_group_label, count_and_flatten, count_by, count_by_key,
    count_values, flatten_by, flatten_by_stage, flatten_by_year, group_by, groups_by_year, pick,
    pluck_where, Row, AGE_GROUP_COUNT,
};
use super::{
    AxisConfig, Catalog, CatalogBuilder, CatalogError, ChartDraft, ChartType, TickFormat,
    VisualConfig,
};
use crate::stats::StatsMap;
use crate::types::{Series, SeriesTable};

const DELAY_STEPS: [&str; 5] = [
    "Notice symptoms",
    "Infer illness",
    "Decide to see PCP",
    "Receive medical attention",
    "Begin Treatment",
];

fn axis(label: &str, tick_format: TickFormat) -> AxisConfig {
    AxisConfig {
        label: Some(label.to_string()).filter(|l| !l.is_empty()),
        tick_format,
        min: None,
    }
}

fn visual(chart_type: ChartType) -> VisualConfig {
    VisualConfig {
        chart_type,
        ..Default::default()
    }
}

/// Year on x, rate per 100,000 on y
fn year_and_people(chart_type: ChartType) -> VisualConfig {
    VisualConfig {
        chart_type,
        x_axis: axis("Year", TickFormat::IndexToYear),
        y_axis: axis("Rate per 100,000", TickFormat::Value),
        ..Default::default()
    }
}

fn delays(groups: [&str; 2], x_label: &str, y_label: &str) -> VisualConfig {
    VisualConfig {
        chart_type: ChartType::Bar,
        groups: vec![groups.iter().map(|g| g.to_string()).collect()],
        x_axis: axis(
            x_label,
            TickFormat::Categories(DELAY_STEPS.iter().map(|s| s.to_string()).collect()),
        ),
        y_axis: axis(y_label, TickFormat::Value),
        ..Default::default()
    }
}

// ==================== Preprocessing ====================

fn delays_by_insurance(rows: &[Row], _: &StatsMap) -> SeriesTable {
    ["COVERED_BY_HEALTH_INSURANCE", "NOT_COVERED_BY_HEALTH_INSURANCE"]
        .iter()
        .map(|v| pluck_where(rows, "Value", v, "Days"))
        .collect::<Vec<_>>()
        .into()
}

fn delays_by_race(rows: &[Row], _: &StatsMap) -> SeriesTable {
    ["AFRICAN_AMERICAN", "WHITE"]
        .iter()
        .map(|v| pluck_where(rows, "Value", v, "Days"))
        .collect::<Vec<_>>()
        .into()
}

fn incidence_by_stage(rows: &[Row], _: &StatsMap) -> SeriesTable {
    groups_by_year(group_by(rows, "Stage")).into()
}

fn incidence_by_year(rows: &[Row], _: &StatsMap) -> SeriesTable {
    vec![flatten_by_year(rows, "incidence")].into()
}

fn incidence_by_race(rows: &[Row], _: &StatsMap) -> SeriesTable {
    groups_by_year(pick(group_by(rows, "Race"), &["WHITE", "AFRICAN_AMERICAN"])).into()
}

fn by_gender_and_year(rows: &[Row], _: &StatsMap) -> SeriesTable {
    groups_by_year(group_by(rows, "Gender")).into()
}

/// Cases per age group as a percentage of that age group's population
fn incidence_by_age(rows: &[Row], stats: &StatsMap) -> SeriesTable {
    group_by(rows, "Gender")
        .into_iter()
        .map(|(gender, items)| {
            let counts = count_by_key(items, |row| {
                age_group_index(row.number("Age"))
                    .map(age_group_label)
                    .unwrap_or_default()
            });
            let values = (0..AGE_GROUP_COUNT)
                .map(|i| {
                    let group = age_group_label(i);
                    let cases = counts
                        .iter()
                        .find(|(k, _)| *k == group)
                        .map(|(_, n)| *n as f64)
                        .unwrap_or(0.0);
                    match stats.get(&group) {
                        Some(population) if population == 0.0 => 0.0,
                        Some(population) => cases / population * 100.0,
                        None => f64::NAN,
                    }
                })
                .collect();
            Series::new(gender, values)
        })
        .collect::<Vec<_>>()
        .into()
}

fn polyp_removal(rows: &[Row], _: &StatsMap) -> SeriesTable {
    vec![Series::new("Polyps", count_values(&count_by(rows, "Year")))].into()
}

fn mortality(rows: &[Row], _: &StatsMap) -> SeriesTable {
    vec![flatten_by_year(rows, "Total")].into()
}

fn mortality_by_reason(rows: &[Row], _: &StatsMap) -> SeriesTable {
    groups_by_year(group_by(rows, "Reason")).into()
}

fn mortality_by_race(rows: &[Row], _: &StatsMap) -> SeriesTable {
    groups_by_year(pick(
        group_by(rows, "Race"),
        &["AFRICAN_AMERICAN", "WHITE", "ASIAN", "AMERICAN_INDIAN"],
    ))
    .into()
}

fn smoking(rows: &[Row], _: &StatsMap) -> SeriesTable {
    ["Does not smoke", "Smokes"]
        .iter()
        .map(|column| flatten_by(rows, column))
        .collect::<Vec<_>>()
        .into()
}

fn cancer_index(rows: &[Row], _: &StatsMap) -> SeriesTable {
    vec![flatten_by(rows, "CancerIndex")].into()
}

fn survivors_by_year(rows: &[Row], _: &StatsMap) -> SeriesTable {
    vec![flatten_by_year(rows, "survivors")].into()
}

/// Reads the run's own `key,value` stats file
fn stages_at_generation(rows: &[Row], _: &StatsMap) -> SeriesTable {
    let value = |key: &str| {
        rows.iter()
            .find(|r| r.is("key", key))
            .map(|r| r.number("value"))
            .unwrap_or(f64::NAN)
    };
    [
        ("polyp5", "polyp"),
        ("stage1", "stage1"),
        ("stage2", "stage2"),
        ("stage3", "stage3"),
        ("stage4", "stage4"),
    ]
    .iter()
    .map(|(id, key)| Series::new(*id, vec![value(key)]))
    .collect::<Vec<_>>()
    .into()
}

fn screening_by_race(rows: &[Row], _: &StatsMap) -> SeriesTable {
    count_and_flatten(rows, "Race").into()
}

fn screening_by_health_insurance(rows: &[Row], _: &StatsMap) -> SeriesTable {
    count_and_flatten(rows, "HealthInsurance").into()
}

fn stages_over_time(rows: &[Row], _: &StatsMap) -> SeriesTable {
    ["POLYP", "STAGE_1", "STAGE_2", "STAGE_3", "STAGE_4"]
        .iter()
        .map(|column| flatten_by(rows, column))
        .collect::<Vec<_>>()
        .into()
}

fn survivors_by_stage(rows: &[Row], _: &StatsMap) -> SeriesTable {
    flatten_by_stage(rows).into()
}

fn survivors_by_stage_and_race(rows: &[Row], _: &StatsMap) -> SeriesTable {
    pick(group_by(rows, "Race"), &["WHITE", "AFRICAN_AMERICAN"])
        .into_iter()
        .map(|(race, items)| Series::new(race, count_values(&count_by(items, "Stage"))))
        .collect::<Vec<_>>()
        .into()
}

fn treatment_by_year(rows: &[Row], _: &StatsMap) -> SeriesTable {
    vec![flatten_by_year(rows, "treatment")].into()
}

// ==================== Catalog ====================

/// The built-in chart catalog
pub fn builtin_catalog() -> Result<Catalog, CatalogError> {
    CatalogBuilder::new()
        .add(
            ChartDraft::new("delaysByInsurance")
                .label("Delays by insurance")
                .source("delays-aggregated.csv")
                .preprocess(delays_by_insurance)
                .visual(delays(
                    ["COVERED_BY_HEALTH_INSURANCE", "NOT_COVERED_BY_HEALTH_INSURANCE"],
                    "Delay type",
                    "Days",
                )),
        )
        .add(
            ChartDraft::new("delaysByRace")
                .label("Delays by race")
                .source("delays-aggregated.csv")
                .preprocess(delays_by_race)
                .visual(delays(["AFRICAN_AMERICAN", "WHITE"], "", "Delay type")),
        )
        .add(
            ChartDraft::new("incidenceByStage")
                .group("incidence by stage")
                .label("Incidence by stage")
                .source("incidence.csv")
                .preprocess(incidence_by_stage)
                .visual(year_and_people(ChartType::Bar)),
        )
        .add(
            ChartDraft::new("incidenceByYear")
                .label("Incidence by year")
                .source("incidence.csv")
                .preprocess(incidence_by_year)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("incidenceByRace")
                .label("Incidence by race")
                .source("incidence.csv")
                .preprocess(incidence_by_race)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("incidenceByGender")
                .label("Incidence by gender")
                .source("incidence.csv")
                .preprocess(by_gender_and_year)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("incidenceByAge")
                .group("incidence by age")
                .label("Incidence by age")
                .source("incidence.csv")
                .preprocess(incidence_by_age)
                .visual(VisualConfig {
                    chart_type: ChartType::Area,
                    x_axis: AxisConfig {
                        min: Some(6.0),
                        ..axis("Age group", TickFormat::AgeGroup)
                    },
                    y_axis: axis("Rate by age group", TickFormat::Value),
                    ..Default::default()
                }),
        )
        .add(
            ChartDraft::new("polypRemoval")
                .group("Polyp removal")
                .label("Polyp removal")
                .source("polyp-removal.csv")
                .preprocess(polyp_removal)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("mortality")
                .group("mortality")
                .label("Mortality")
                .source("mortality.csv")
                .preprocess(mortality)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("mortalityByGender")
                .label("Mortality by gender")
                .source("mortality.csv")
                .preprocess(by_gender_and_year)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("mortalityByReason")
                .disabled(false)
                .label("Mortality by Reason")
                .source("mortality.csv")
                .preprocess(mortality_by_reason)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("mortalityByRace")
                .label("Mortality by race")
                .source("mortality.csv")
                .preprocess(mortality_by_race)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("smoking")
                .disabled(true)
                .group("smoking")
                .label("Smoking")
                .source("smoking.csv")
                .preprocess(smoking)
                .visual(visual(ChartType::Area)),
        )
        .add(
            ChartDraft::new("cancerIndex")
                .disabled(true)
                .group("cancerIndex")
                .label("cancerIndex")
                .source("cancerIndex.csv")
                .preprocess(cancer_index)
                .visual(visual(ChartType::Area)),
        )
        .add(
            ChartDraft::new("survivorByYear")
                .disabled(false)
                .label("Survivors by year")
                .source("survivors.csv")
                .preprocess(survivors_by_year)
                .visual(year_and_people(ChartType::Area)),
        )
        .add(
            ChartDraft::new("stagesAtGeneration")
                .disabled(true)
                .label("Stages at generation")
                .source("stats.csv")
                .preprocess(stages_at_generation)
                .visual(VisualConfig {
                    point_radius: Some(0.0),
                    ..visual(ChartType::Bar)
                }),
        )
        .add(
            ChartDraft::new("_screeningByRace")
                .disabled(false)
                .label("Screening By Race")
                .source("screening.csv")
                .preprocess(screening_by_race)
                .visual(visual(ChartType::Bar)),
        )
        .add(
            ChartDraft::new("_screeningByHealthInsurance")
                .disabled(false)
                .label("Screening By HI")
                .source("screening.csv")
                .preprocess(screening_by_health_insurance)
                .visual(visual(ChartType::Bar)),
        )
        .add(
            ChartDraft::new("stages")
                .disabled(true)
                .group("stages")
                .label("Stages over time")
                .source("byStage.csv")
                .preprocess(stages_over_time)
                .adjust("per100k")
                .visual(VisualConfig {
                    point_radius: Some(0.0),
                    ..visual(ChartType::Area)
                }),
        )
        .add(
            ChartDraft::new("survivorByStage")
                .group("Survivors")
                .label("Survivors by stage")
                .source("survivors.csv")
                .preprocess(survivors_by_stage)
                .visual(VisualConfig {
                    chart_type: ChartType::Bar,
                    x_axis: axis("", TickFormat::Hidden),
                    y_axis: axis("Rate per 100,000", TickFormat::Value),
                    ..Default::default()
                }),
        )
        .add(
            ChartDraft::new("survivorByStageAndRace")
                .label("Survivors by race")
                .source("survivors.csv")
                .preprocess(survivors_by_stage_and_race)
                .visual(VisualConfig {
                    chart_type: ChartType::Bar,
                    x_axis: axis(
                        "Year",
                        TickFormat::Categories(
                            ["Stage 1", "Stage 2", "Stage 3", "Stage 4"]
                                .iter()
                                .map(|s| s.to_string())
                                .collect(),
                        ),
                    ),
                    y_axis: axis("Rate per 100,000", TickFormat::Value),
                    ..Default::default()
                }),
        )
        .add(
            ChartDraft::new("stageUpdate")
                .disabled(true)
                .label("stageUpdate")
                .source("stageUpdate.csv")
                .preprocess(treatment_by_year)
                .visual(VisualConfig {
                    chart_type: ChartType::Bar,
                    x_axis: AxisConfig {
                        tick_format: TickFormat::IndexToYear,
                        ..Default::default()
                    },
                    ..Default::default()
                }),
        )
        .add(
            ChartDraft::new("treatmentByYear")
                .disabled(true)
                .label("Treatment by year")
                .source("treatment.csv")
                .preprocess(treatment_by_year)
                .visual(VisualConfig {
                    chart_type: ChartType::Bar,
                    x_axis: AxisConfig {
                        tick_format: TickFormat::IndexToYear,
                        ..Default::default()
                    },
                    ..Default::default()
                }),
        )
        .build()
}
