//! Summary statistics over a member snapshot.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::domain::entities::{Gender, Member};

pub const DEFAULT_GENERATION_SPAN: i32 = 25;

/// Counts of living members per age bracket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgeGroups {
    #[serde(rename = "0-18")]
    pub children: usize,
    #[serde(rename = "19-35")]
    pub young_adults: usize,
    #[serde(rename = "36-50")]
    pub adults: usize,
    #[serde(rename = "51-65")]
    pub middle_aged: usize,
    #[serde(rename = "65+")]
    pub seniors: usize,
}

impl AgeGroups {
    fn record(&mut self, age: u32) {
        match age {
            0..=18 => self.children += 1,
            19..=35 => self.young_adults += 1,
            36..=50 => self.adults += 1,
            51..=65 => self.middle_aged += 1,
            _ => self.seniors += 1,
        }
    }

    /// Bracket labels with their counts, youngest first.
    pub fn rows(&self) -> [(&'static str, usize); 5] {
        [
            ("0-18", self.children),
            ("19-35", self.young_adults),
            ("36-50", self.adults),
            ("51-65", self.middle_aged),
            ("65+", self.seniors),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyStatistics {
    pub total: usize,
    pub male: usize,
    pub female: usize,
    pub living: usize,
    pub deceased: usize,
    /// Whole years, rounded; 0 when no lifespan is known
    pub average_lifespan: u32,
    pub age_groups: AgeGroups,
    /// Distinct birth-year buckets of `generation_span` years
    pub generations: usize,
}

impl FamilyStatistics {
    pub fn calculate(members: &[Member], today: NaiveDate) -> Self {
        Self::calculate_with_span(members, today, DEFAULT_GENERATION_SPAN)
    }

    /// Members with a death date count as deceased; lifespans outside 1..150
    /// years are ignored as data errors.
    pub fn calculate_with_span(members: &[Member], today: NaiveDate, generation_span: i32) -> Self {
        let span = generation_span.max(1);
        let mut stats = Self {
            total: members.len(),
            ..Self::default()
        };
        let mut lifespans: Vec<u32> = Vec::new();
        let mut generations: BTreeSet<i32> = BTreeSet::new();

        for member in members {
            match member.gender {
                Gender::Male => stats.male += 1,
                Gender::Female => stats.female += 1,
                Gender::Unknown => {}
            }

            match (member.death_date, member.birth_date) {
                (Some(death), birth) => {
                    stats.deceased += 1;
                    if let Some(years) = birth.and_then(|b| death.years_since(b)) {
                        if years > 0 && years < 150 {
                            lifespans.push(years);
                        }
                    }
                }
                (None, birth) => {
                    stats.living += 1;
                    // Births after `today` count as age 0.
                    if let Some(age) = birth.map(|b| today.years_since(b).unwrap_or(0)) {
                        stats.age_groups.record(age);
                    }
                }
            }

            if let Some(birth) = member.birth_date {
                generations.insert(birth.year().div_euclid(span));
            }
        }

        if !lifespans.is_empty() {
            let sum: u64 = lifespans.iter().map(|&y| u64::from(y)).sum();
            let avg = (sum as f64 / lifespans.len() as f64).round();
            stats.average_lifespan = avg as u32;
        }
        stats.generations = generations.len();
        stats
    }

    /// `Metric,Value` rows for spreadsheet export.
    pub fn to_csv(&self) -> String {
        let mut lines = vec![
            "Metric,Value".to_string(),
            format!("Total Members,{}", self.total),
            format!("Living Members,{}", self.living),
            format!("Deceased Members,{}", self.deceased),
            format!("Male,{}", self.male),
            format!("Female,{}", self.female),
            format!("Generations,{}", self.generations),
            format!("Average Lifespan,{}", self.average_lifespan),
        ];
        lines.extend(
            self.age_groups
                .rows()
                .iter()
                .map(|(label, count)| format!("Age {label},{count}")),
        );
        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn given_mixed_members_when_calculating_then_counts_and_lifespan() {
        let today = date(2024, 6, 1);
        let mut grandpa = Member::new("g", "G")
            .with_gender(Gender::Male)
            .with_birth_date(date(1920, 3, 1));
        grandpa.death_date = Some(date(2000, 2, 1)); // 79 years
        let mut grandma = Member::new("gm", "Gm")
            .with_gender(Gender::Female)
            .with_birth_date(date(1925, 1, 1));
        grandma.death_date = Some(date(2006, 1, 1)); // 81 years
        let kid = Member::new("k", "K").with_birth_date(date(2010, 1, 1));
        let undated = Member::new("u", "U").with_gender(Gender::Female);

        let stats = FamilyStatistics::calculate(&[grandpa, grandma, kid, undated], today);

        assert_eq!(stats.total, 4);
        assert_eq!((stats.male, stats.female), (1, 2));
        assert_eq!((stats.living, stats.deceased), (2, 2));
        assert_eq!(stats.average_lifespan, 80);
        assert_eq!(stats.age_groups.children, 1);
        // 1920 and 1925 share the 76th bucket, 2010 is the 80th
        assert_eq!(stats.generations, 2);
    }

    #[test]
    fn given_implausible_lifespan_when_calculating_then_ignored() {
        let mut member = Member::new("x", "X").with_birth_date(date(1700, 1, 1));
        member.death_date = Some(date(1990, 1, 1));
        let stats = FamilyStatistics::calculate(&[member], date(2024, 1, 1));
        assert_eq!(stats.deceased, 1);
        assert_eq!(stats.average_lifespan, 0);
    }

    #[test]
    fn given_statistics_when_exporting_csv_then_metric_rows() {
        let stats = FamilyStatistics::calculate(&[Member::new("a", "A")], date(2024, 1, 1));
        let csv = stats.to_csv();
        assert!(csv.starts_with("Metric,Value\n"));
        assert!(csv.contains("Total Members,1\n"));
        assert!(csv.contains("Age 65+,0\n"));
    }
}
