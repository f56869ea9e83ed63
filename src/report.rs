use colored::Colorize;

use crate::{pipeline::Partition, record::EpisodeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub title: &'static str,
    pub lines: Vec<String>,
}

/// Success and failure sections for a pipeline run. Empty sections are
/// left out.
pub fn sections(partition: &Partition) -> Vec<Section> {
    let success = Section {
        kind: SectionKind::Success,
        title: "Successfully identified:",
        lines: partition
            .success
            .iter()
            .map(|record| line(record, record.new_name.as_deref().unwrap_or_default()))
            .collect(),
    };
    [success, failure_section("Failures:", &partition.failure)]
        .into_iter()
        .filter(|section| !section.lines.is_empty())
        .collect()
}

pub fn failure_section<'a, I>(title: &'static str, records: I) -> Section
where
    I: IntoIterator<Item = &'a EpisodeRecord>,
{
    Section {
        kind: SectionKind::Failure,
        title,
        lines: records
            .into_iter()
            .map(|record| line(record, record.failure_reason().unwrap_or_default()))
            .collect(),
    }
}

fn line(record: &EpisodeRecord, detail: &str) -> String {
    format!("{} -> {}", record.basename(), detail)
}

/// Plain-text rendering, sections separated by a blank line.
pub fn render(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|section| {
            let mut text = format!("{}\n", section.title);
            for line in &section.lines {
                text.push_str(&format!("    {}\n", line));
            }
            text
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print(sections: &[Section]) {
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let title = match section.kind {
            SectionKind::Success => section.title.green().bold(),
            SectionKind::Failure => section.title.red().bold(),
        };
        println!("{}", title);
        for line in &section.lines {
            println!("    {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FailureKind;

    fn success(path: &str, new_name: &str) -> EpisodeRecord {
        EpisodeRecord {
            new_name: Some(new_name.to_string()),
            ..EpisodeRecord::new(path)
        }
    }

    fn failure(path: &str, reason: &str) -> EpisodeRecord {
        EpisodeRecord::new(path).fail(FailureKind::NotIdentified, reason)
    }

    #[test]
    fn test_render_both_sections() {
        let partition = Partition {
            success: vec![success("/in/[Blah] some show - 01.mkv", "some show - S1E01.mkv")],
            failure: vec![failure("/in/other - 02.mkv", "Series not identified (confidence=40)")],
        };
        assert_eq!(
            render(&sections(&partition)),
            "Successfully identified:\n    [Blah] some show - 01.mkv -> some show - S1E01.mkv\n\n\
             Failures:\n    other - 02.mkv -> Series not identified (confidence=40)\n"
        );
    }

    #[test]
    fn test_empty_sections_omitted() {
        let only_failures = Partition {
            success: vec![],
            failure: vec![failure("a.mkv", "Could not parse episode number")],
        };
        assert_eq!(
            render(&sections(&only_failures)),
            "Failures:\n    a.mkv -> Could not parse episode number\n"
        );

        let only_success = Partition {
            success: vec![success("a.mkv", "b - S1E01.mkv")],
            failure: vec![],
        };
        assert_eq!(
            render(&sections(&only_success)),
            "Successfully identified:\n    a.mkv -> b - S1E01.mkv\n"
        );

        assert!(sections(&Partition::default()).is_empty());
    }

    #[test]
    fn test_section_kinds() {
        let partition = Partition {
            success: vec![success("a.mkv", "b - S1E01.mkv")],
            failure: vec![failure("c.mkv", "Could not parse series name")],
        };
        let kinds: Vec<_> = sections(&partition)
            .iter()
            .map(|section| section.kind)
            .collect();
        assert_eq!(kinds, vec![SectionKind::Success, SectionKind::Failure]);
    }

    #[test]
    fn test_failure_section_order() {
        let records = vec![failure("b.mkv", "second"), failure("a.mkv", "first")];
        let section = failure_section("Move failures:", &records);
        assert_eq!(section.kind, SectionKind::Failure);
        assert_eq!(section.lines, vec!["b.mkv -> second", "a.mkv -> first"]);
    }
}
