use super::domain::{StepKey, StepTemplate};

#[derive(Debug, Clone)]
pub struct ClosureBlueprint {
    steps: Vec<StepTemplate>,
}

impl ClosureBlueprint {
    pub fn standard() -> Self {
        Self {
            steps: standard_step_templates(),
        }
    }

    pub fn steps(&self) -> &[StepTemplate] {
        &self.steps
    }

    pub fn step(&self, key: StepKey) -> Option<&StepTemplate> {
        self.steps.iter().find(|step| step.key == key)
    }
}

impl Default for ClosureBlueprint {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_step_templates() -> Vec<StepTemplate> {
    vec![
        StepTemplate {
            key: StepKey::Validation,
            name: "Validate Evaluations",
            required: true,
            terminal: false,
            depends_on: Vec::new(),
            description: "Confirm every rostered player was scored in the current event; unevaluated players become archive warnings.",
        },
        StepTemplate {
            key: StepKey::AiReports,
            name: "Generate Player Reports",
            required: false,
            terminal: false,
            depends_on: vec![StepKey::Validation],
            description: "Request a narrative report for each evaluated player from the report generator.",
        },
        StepTemplate {
            key: StepKey::StatsCompilation,
            name: "Compile Camp Statistics",
            required: true,
            terminal: false,
            depends_on: vec![StepKey::Validation],
            description: "Summarize averages, spreads, tag and trend distribution, and evaluator participation.",
        },
        StepTemplate {
            key: StepKey::ExportData,
            name: "Export Camp Data",
            required: true,
            terminal: false,
            depends_on: vec![StepKey::StatsCompilation],
            description: "Hand the player summaries (CSV) and statistics (JSON) to the export sink.",
        },
        StepTemplate {
            key: StepKey::PlayerHistory,
            name: "Update Player History",
            required: true,
            terminal: false,
            depends_on: vec![StepKey::ExportData],
            description: "Append each player's final tag, trend, and overall score to the long-term history store.",
        },
        StepTemplate {
            key: StepKey::FinalArchive,
            name: "Archive Camp",
            required: true,
            terminal: true,
            depends_on: vec![
                StepKey::Validation,
                StepKey::StatsCompilation,
                StepKey::ExportData,
                StepKey::PlayerHistory,
            ],
            description: "Write the archive record and seal the camp against further scoring.",
        },
    ]
}
