use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub(crate) const SECTION_COUNT: usize = 4;
pub(crate) const SECTION_TITLES: [&str; SECTION_COUNT] = ["About", "Skills", "Projects", "Contact"];
/// Longest title the header bar and canvas title will show, in characters.
pub(crate) const MAX_TITLE_CHARS: usize = 32;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Section {
    #[serde(skip)]
    pub(crate) index: usize,
    pub(crate) title: String,
    pub(crate) lines: Vec<String>,
    #[serde(default)]
    pub(crate) is_header: Vec<bool>,
    /// Line height as a fraction of the visible canvas height.
    pub(crate) line_height_factor: f32,
}

impl Section {
    fn new(index: usize, lines: &[&str], is_header: &[bool], line_height_factor: f32) -> Self {
        Self {
            index,
            title: SECTION_TITLES[index].to_string(),
            lines: lines.iter().map(|s| s.to_string()).collect(),
            is_header: is_header.to_vec(),
            line_height_factor,
        }
        .normalized()
    }

    pub(crate) fn header_at(&self, i: usize) -> bool {
        self.is_header.get(i).copied().unwrap_or(false)
    }

    /// Pads or truncates the header flags to the line count, shortens long
    /// titles and keeps the line-height factor positive.
    pub(crate) fn normalized(mut self) -> Self {
        self.is_header.resize(self.lines.len(), false);
        if self.title.chars().count() > MAX_TITLE_CHARS {
            self.title = self.title.chars().take(MAX_TITLE_CHARS).collect();
        }
        if !self.line_height_factor.is_finite() || self.line_height_factor <= 0.0 {
            self.line_height_factor = 0.02;
        }
        self.line_height_factor = self.line_height_factor.min(0.25);
        self
    }
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    sections: Vec<Section>,
}

pub(crate) fn load_content(path: &Path) -> Result<Vec<Section>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read content file {}", path.display()))?;
    parse_content(&raw).with_context(|| format!("invalid content file {}", path.display()))
}

pub(crate) fn parse_content(raw: &str) -> Result<Vec<Section>> {
    let file: ContentFile = serde_json::from_str(raw)?;
    if file.sections.len() < SECTION_COUNT {
        bail!(
            "expected {} sections, found {}",
            SECTION_COUNT,
            file.sections.len()
        );
    }
    if file.sections.len() > SECTION_COUNT {
        warn!(
            "content file has {} sections; only the first {} are shown",
            file.sections.len(),
            SECTION_COUNT
        );
    }
    Ok(file
        .sections
        .into_iter()
        .take(SECTION_COUNT)
        .enumerate()
        .map(|(i, mut s)| {
            s.index = i;
            s.normalized()
        })
        .collect())
}

pub(crate) fn builtin_sections() -> Vec<Section> {
    vec![
        Section::new(
            0,
            &[
                "Hey, I'm Luke McMahon. I'm a software developer with a passion for new technologies and creative problem solving.",
                "",
                "Through my projects, both personal and professional, and through competitive programming, I have worked with a wide variety of tools and languages, and I love learning more every day!",
                "",
                "In addition to programming, I enjoy learning new things, tennis, Magic the Gathering, and both playing and making video games.",
            ],
            &[],
            0.04,
        ),
        Section::new(
            1,
            &[
                "I have extensive experience with the following:",
                "",
                "Programming Languages",
                "C#, TypeScript, Python, Java, JavaScript, C, C++, MSSQL, MUMPS, PromQL",
                "",
                "Technologies",
                "React, Node.js, .NET, RESTful APIs, Jest, Docker, Kubernetes, Prometheus, Grafana, AWS, Cosmos DB, Flask, Claude Code, Unity",
                "",
                "Languages",
                "English (native), Spanish (conversational), Japanese (learning!)",
            ],
            &[false, false, true, false, false, true, false, false, true, false],
            0.03,
        ),
        Section::new(
            2,
            &[
                "Here are some of my projects:",
                "",
                "AI Captioning for Epic Video Client",
                "    - Developed AI-powered real-time captioning for the Epic Video Client by extending backend services (C#/.NET), updating Azure Cosmos DB data models and integrating WebRTC vendor APIs and speech-to-text services to meet U.S. accessibility compliance requirements.",
                "    - Designed and implemented React-based UI components for real-time caption rendering, ensuring accessible, low-latency display across clinical and patient-facing workflows.",
                "    - Built Prometheus alerts and Grafana dashboards to monitor captioning reliability, enabling quick response to outages and higher system availability.",
                "    - Implemented caption usage metrics reporting, improving insight into feature adoption and load patterns across health systems.",
                "",
                "Captioning in Teleregistration",
                "    - Worked closely with the teleregistration team to create a way of displaying captions in the teleregistration view on a Welcome kiosk.",
                "    - Designed and implemented a framework to send messages to and from the Welcome kiosk to ensure caption state is consistent between Epic Video Client iframe and the kiosk",
                "",
                "AI Hardware Testing",
                "    - Worked on a project using LLMs, YOLO, and other models to find issues with video and audio feeds in Epic Video Client's hardware test",
                "",
                "Whiteboarding and Annotations in Epic Video Client",
                "    - Added whiteboarding and annotation features to the Epic Video Client, allowing users to draw and annotate directly on shared video streams as well as a shared whiteboard during calls.",
                "    - Allowed for various annotation tools including freehand drawing, emojis, text, and erasing.",
                "    - Implemented real-time synchronization of annotations across all participants using WebRTC data channels.",
                "",
                "LinkedIn Salary Predictor",
                "    - Scraped, cleaned, and manipulated LinkedIn job posting data using Python to create a dataset of feature-rich job data that could be useful for determining salaries.",
                "    - Built a machine learning model using Python and keras to predict salaries based on LinkedIn job posting data, achieving an R² score of 0.75.",
                "",
                "Personal Website",
                "    - Built a responsive website using React and Three.js to showcase my projects and skills with an interactive 3D experience.",
            ],
            &[
                false, false, true, false, false, false, false, false, true, false, false, false,
                true, false, false, true, false, false, false, false, true, false, false, false,
                true, false,
            ],
            0.02,
        ),
        Section::new(
            3,
            &["Want to know more?", "Let's talk!"],
            &[],
            0.06,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sections_have_parallel_header_flags() {
        let sections = builtin_sections();
        assert_eq!(sections.len(), SECTION_COUNT);
        for (i, s) in sections.iter().enumerate() {
            assert_eq!(s.index, i);
            assert_eq!(s.title, SECTION_TITLES[i]);
            assert_eq!(s.lines.len(), s.is_header.len());
        }
        assert!(sections[1].header_at(2));
        assert!(!sections[0].header_at(99));
    }

    #[test]
    fn content_file_is_normalised() {
        let raw = r#"{"sections":[
            {"title":"A","lines":["x","y"],"is_header":[true,false,true],"line_height_factor":0.03},
            {"title":"B","lines":["z"],"line_height_factor":-1.0},
            {"title":"C","lines":[],"line_height_factor":0.02},
            {"title":"D","lines":["w"],"is_header":[],"line_height_factor":0.9},
            {"title":"E","lines":[],"line_height_factor":0.02}
        ]}"#;
        let sections = parse_content(raw).unwrap();
        assert_eq!(sections.len(), SECTION_COUNT);
        assert_eq!(sections[0].is_header, vec![true, false]);
        assert_eq!(sections[1].is_header, vec![false]);
        assert_eq!(sections[1].line_height_factor, 0.02);
        assert_eq!(sections[3].line_height_factor, 0.25);
        assert_eq!(sections[3].index, 3);
    }

    #[test]
    fn long_titles_are_shortened() {
        let long = "é".repeat(70_000);
        let raw = format!(
            r#"{{"sections":[
            {{"title":"{long}","lines":[],"line_height_factor":0.03}},
            {{"title":"B","lines":[],"line_height_factor":0.03}},
            {{"title":"C","lines":[],"line_height_factor":0.03}},
            {{"title":"D","lines":[],"line_height_factor":0.03}}
        ]}}"#
        );
        let sections = parse_content(&raw).unwrap();
        assert_eq!(sections[0].title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(sections[1].title, "B");
    }

    #[test]
    fn short_content_file_is_rejected() {
        let raw = r#"{"sections":[{"title":"A","lines":[],"line_height_factor":0.03}]}"#;
        assert!(parse_content(raw).is_err());
    }
}
