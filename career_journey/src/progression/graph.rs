//! Career Graph
//!
//! The ordered, read-only sequence of career stages. Loaded once at startup
//! (either the built-in lineworker roadmap or a JSON file) and shared by
//! reference between every store.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

// ============================================================
// ERRORS
// ============================================================

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Failed to read career graph: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse career graph: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Career graph has no stages")]
    Empty,

    #[error("Duplicate stage id: {0}")]
    DuplicateStage(String),

    #[error("Stage {0} has level 0 (levels are 1-based)")]
    ZeroLevel(String),

    #[error("Stage {stage} lists unknown prerequisite {prerequisite}")]
    UnknownPrerequisite { stage: String, prerequisite: String },

    #[error("Prerequisite cycle through stage {0}")]
    Cycle(String),
}

// ============================================================
// CAREER STAGE
// ============================================================

/// One step of the career progression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerStage {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 1-based ordinal
    pub level: u32,
    /// Skill labels, optionally "title: detail"
    #[serde(default, alias = "details")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    /// Direct predecessors only
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

/// A single explorable skill or certification of a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageItem<'a> {
    pub id: String,
    pub title: &'a str,
    pub detail: Option<&'a str>,
    pub label: &'a str,
}

impl CareerStage {
    pub fn new(id: &str, title: &str, level: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            level,
            skills: Vec::new(),
            certifications: Vec::new(),
            prerequisites: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_skills(mut self, skills: &[&str]) -> Self {
        self.skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_certifications(mut self, certifications: &[&str]) -> Self {
        self.certifications = certifications.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_prerequisites(mut self, prerequisites: &[&str]) -> Self {
        self.prerequisites = prerequisites.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Static skill + certification count
    pub fn total_items(&self) -> usize {
        self.skills.len() + self.certifications.len()
    }

    pub fn skill_items(&self) -> impl Iterator<Item = StageItem<'_>> {
        self.skills
            .iter()
            .enumerate()
            .map(|(i, label)| StageItem::new(skill_item_id(i), label))
    }

    pub fn certification_items(&self) -> impl Iterator<Item = StageItem<'_>> {
        self.certifications
            .iter()
            .enumerate()
            .map(|(i, label)| StageItem::new(cert_item_id(i), label))
    }
}

impl<'a> StageItem<'a> {
    fn new(id: String, label: &'a str) -> Self {
        let (title, detail) = split_item_label(label);
        Self {
            id,
            title,
            detail,
            label,
        }
    }
}

pub fn skill_item_id(index: usize) -> String {
    format!("skill-{}", index)
}

pub fn cert_item_id(index: usize) -> String {
    format!("cert-{}", index)
}

/// Split a "title: detail" label at its first colon
pub fn split_item_label(label: &str) -> (&str, Option<&str>) {
    match label.split_once(':') {
        Some((title, detail)) => {
            let title = title.trim();
            let detail = detail.trim();
            let title = if title.is_empty() { label.trim() } else { title };
            (title, (!detail.is_empty()).then_some(detail))
        }
        None => (label.trim(), None),
    }
}

// ============================================================
// CAREER GRAPH
// ============================================================

/// Ordered, validated list of stages
#[derive(Debug, Clone)]
pub struct CareerGraph {
    stages: Vec<CareerStage>,
    index: HashMap<String, usize>,
}

impl CareerGraph {
    /// Build a graph, rejecting structurally invalid stage lists
    pub fn new(stages: Vec<CareerStage>) -> Result<Self, GraphError> {
        validate(&stages)?;
        Ok(Self::indexed(stages))
    }

    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let stages: Vec<CareerStage> = serde_json::from_str(json)?;
        Self::new(stages)
    }

    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let raw = std::fs::read_to_string(path)?;
        let graph = Self::from_json_str(&raw)?;
        log::info!(
            "[GRAPH] Loaded {} stages from {}",
            graph.len(),
            path.display()
        );
        Ok(graph)
    }

    /// The built-in Electrical Lineworker roadmap
    pub fn lineworker() -> Self {
        Self::indexed(lineworker_stages())
    }

    fn indexed(stages: Vec<CareerStage>) -> Self {
        let index = stages
            .iter()
            .enumerate()
            .map(|(i, stage)| (stage.id.clone(), i))
            .collect();
        Self { stages, index }
    }

    pub fn stages(&self) -> &[CareerStage] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&CareerStage> {
        self.index.get(id).map(|&i| &self.stages[i])
    }

    pub fn stage_at(&self, index: usize) -> Option<&CareerStage> {
        self.stages.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn final_stage(&self) -> Option<&CareerStage> {
        self.stages.last()
    }

    pub fn is_final_stage(&self, id: &str) -> bool {
        self.final_stage().is_some_and(|stage| stage.id == id)
    }
}

fn validate(stages: &[CareerStage]) -> Result<(), GraphError> {
    if stages.is_empty() {
        return Err(GraphError::Empty);
    }

    let mut seen = HashSet::new();
    for stage in stages {
        if !seen.insert(stage.id.as_str()) {
            return Err(GraphError::DuplicateStage(stage.id.clone()));
        }
        if stage.level == 0 {
            return Err(GraphError::ZeroLevel(stage.id.clone()));
        }
    }

    for stage in stages {
        for prereq in &stage.prerequisites {
            if !seen.contains(prereq.as_str()) {
                return Err(GraphError::UnknownPrerequisite {
                    stage: stage.id.clone(),
                    prerequisite: prereq.clone(),
                });
            }
        }
    }

    detect_cycles(stages)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

fn detect_cycles(stages: &[CareerStage]) -> Result<(), GraphError> {
    let by_id: HashMap<&str, &CareerStage> =
        stages.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut marks: HashMap<&str, Visit> = HashMap::new();

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a CareerStage>,
        marks: &mut HashMap<&'a str, Visit>,
    ) -> Result<(), GraphError> {
        match marks.get(id) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => return Err(GraphError::Cycle(id.to_string())),
            None => {}
        }
        marks.insert(id, Visit::InProgress);
        if let Some(&stage) = by_id.get(id) {
            for prereq in &stage.prerequisites {
                visit(prereq.as_str(), by_id, marks)?;
            }
        }
        marks.insert(id, Visit::Done);
        Ok(())
    }

    for stage in stages {
        visit(stage.id.as_str(), &by_id, &mut marks)?;
    }
    Ok(())
}

// ============================================================
// BUILT-IN ROADMAP
// ============================================================

fn lineworker_stages() -> Vec<CareerStage> {
    vec![
        CareerStage::new("1", "The Foundation (Pre-Entry)", 1)
            .with_description("Before you touch a wire, you must meet the physical and legal baselines.")
            .with_skills(&[
                "High School Diploma or GED (Focus on Algebra and Physics)",
                "Aptitude for heights (working 60ft+ in the air)",
                "Upper body strength (lifting 50-100 lbs)",
                "Stamina for extreme weather (storms, heat, snow)",
            ])
            .with_certifications(&[
                "CDL Class A: Commercial Driver's License for bucket and digger derrick trucks",
                "DOT Medical Card: Required to maintain the CDL",
            ]),
        CareerStage::new("2", "Groundman / Pre-Apprentice", 2)
            .with_description("Pay your dues on the ground while watching the experts above.")
            .with_prerequisites(&["1"])
            .with_skills(&[
                "Rigging & Knots: Learning how to secure loads and tools for lifting",
                "Tool Identification: Knowing every bolt, insulator, and bracket by name",
                "Truck Operations: Setting up outriggers and basic derrick operations",
            ])
            .with_certifications(&[
                "OSHA 10/30 (Construction): Safety standards for work sites",
                "CPR & First Aid: Critical for a high-risk environment",
                "Flagging Certification: Managing traffic around the work zone",
            ]),
        CareerStage::new("3", "Apprentice Year 1: Basic Skills", 3)
            .with_description("Master the fundamentals of climbing and electrical theory.")
            .with_prerequisites(&["2"])
            .with_skills(&[
                "Wood Pole Climbing: Mastering the gaffs (climbing spikes) and fall protection",
                "Electrical Theory: Understanding Volts, Amps, Ohms, and Wattage",
            ]),
        CareerStage::new("4", "Apprentice Year 2: Low-Voltage & Secondary", 4)
            .with_description("Work on lines that go directly to homes.")
            .with_prerequisites(&["3"])
            .with_skills(&[
                "Secondary Wiring: Working on the lines that go directly to homes",
                "Transformer Basics: Learning how power is stepped down",
            ]),
        CareerStage::new("5", "Apprentice Year 3: High-Voltage & Hot Work", 5)
            .with_description("Working on energized lines using protective gear.")
            .with_prerequisites(&["4"])
            .with_skills(&[
                "Rubber Gloving: Working on energized lines using protective gear",
                "Hot Sticking: Using insulated poles to work on lines from a distance",
            ]),
        CareerStage::new("6", "Apprentice Year 4: Advanced Systems", 6)
            .with_description("Understanding industrial power distribution and troubleshooting.")
            .with_prerequisites(&["5"])
            .with_skills(&[
                "Three-Phase Power: Understanding industrial power distribution",
                "Troubleshooting: Identifying why the lights are out using meters and diagrams",
            ]),
        CareerStage::new("7", "Journeyman Lineworker", 7)
            .with_description("Master of the trade with full competency.")
            .with_prerequisites(&["6"])
            .with_skills(&[
                "Live-Line Maintenance: Working on transmission lines without turning off the power",
                "Underground Distribution: Splicing high-voltage cables and working in vaults",
                "Substation Awareness: Understanding the brain of the grid",
                "Emergency Response: Leading crews during storm restoration",
            ]),
        CareerStage::new("8", "Career Specialization & Leadership", 8)
            .with_description("Choose your final branch and lead teams.")
            .with_prerequisites(&["7"])
            .with_skills(&[
                "Crew Leader / Foreman: Managing a team and project safety on-site",
                "Troubleshooter: Solo operator who responds to immediate outages",
                "Safety Coordinator: Moving into training and OSHA compliance",
                "Load Dispatcher: Working in a control room to manage the flow of the entire grid",
            ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lineworker_graph_is_valid() {
        let graph = CareerGraph::lineworker();
        assert_eq!(graph.len(), 8);
        assert!(validate(graph.stages()).is_ok());
        assert_eq!(graph.position("3"), Some(2));
        assert!(graph.is_final_stage("8"));
        assert!(!graph.is_final_stage("7"));
        assert_eq!(graph.stage("2").map(|s| s.total_items()), Some(6));
    }

    #[test]
    fn test_split_item_label() {
        assert_eq!(
            split_item_label("Rigging & Knots: Learning how to secure loads"),
            ("Rigging & Knots", Some("Learning how to secure loads"))
        );
        assert_eq!(
            split_item_label("Aptitude for heights (working 60ft+ in the air)"),
            ("Aptitude for heights (working 60ft+ in the air)", None)
        );
        assert_eq!(split_item_label("Title:"), ("Title", None));
    }

    #[test]
    fn test_stage_item_ids() {
        let graph = CareerGraph::lineworker();
        let stage = graph.stage("2").unwrap();

        let skills: Vec<_> = stage.skill_items().collect();
        assert_eq!(skills[0].id, "skill-0");
        assert_eq!(skills[0].title, "Rigging & Knots");

        let certs: Vec<_> = stage.certification_items().collect();
        assert_eq!(certs[2].id, "cert-2");
        assert_eq!(certs[2].title, "Flagging Certification");
    }

    #[test]
    fn test_from_json_accepts_details_alias() {
        let json = r#"[
            {"id": "a", "title": "A", "level": 1, "details": ["One: first"]},
            {"id": "b", "title": "B", "level": 2, "prerequisites": ["a"]}
        ]"#;

        let graph = CareerGraph::from_json_str(json).unwrap();
        assert_eq!(graph.stage("a").unwrap().skills, vec!["One: first".to_string()]);
        assert!(graph.stage("b").unwrap().certifications.is_empty());
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(CareerGraph::new(Vec::new()), Err(GraphError::Empty)));

        let dup = vec![CareerStage::new("a", "A", 1), CareerStage::new("a", "A2", 2)];
        assert!(matches!(CareerGraph::new(dup), Err(GraphError::DuplicateStage(id)) if id == "a"));

        let zero = vec![CareerStage::new("a", "A", 0)];
        assert!(matches!(CareerGraph::new(zero), Err(GraphError::ZeroLevel(_))));

        let unknown = vec![CareerStage::new("a", "A", 1).with_prerequisites(&["ghost"])];
        assert!(matches!(
            CareerGraph::new(unknown),
            Err(GraphError::UnknownPrerequisite { .. })
        ));

        let cycle = vec![
            CareerStage::new("a", "A", 1).with_prerequisites(&["b"]),
            CareerStage::new("b", "B", 2).with_prerequisites(&["a"]),
        ];
        assert!(matches!(CareerGraph::new(cycle), Err(GraphError::Cycle(_))));
    }
}
