//! Release tag generation
//!
//! Generation is purely local. A batch is either tagged completely or not at
//! all: every tag is computed before any record is touched.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, Result};
use crate::record::{RepoRecord, TagType};

/// Source of the current instant
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format an instant as a calver stamp (`YYYYMMDD-HHMM`, UTC)
pub fn calver(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d-%H%M").to_string()
}

/// Builds release tags from records
#[derive(Debug, Clone, Default)]
pub struct TagGenerator<C = SystemClock> {
    clock: C,
}

impl<C: Clock> TagGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Current instant of the generator's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Generate the tag for one record at the clock's current instant
    pub fn generate(&self, record: &RepoRecord) -> Result<String> {
        generate_at(record, self.clock.now())
    }

    /// Generate and assign tags for a whole batch
    ///
    /// The clock is read once so every calver record of a batch shares the
    /// same stamp. If any record fails, no record is modified.
    pub fn assign(&self, records: &mut [RepoRecord]) -> Result<()> {
        let now = self.clock.now();
        let tags = records
            .iter()
            .map(|record| generate_at(record, now))
            .collect::<Result<Vec<_>>>()?;

        if let Some(tagged) = records.iter().find(|r| r.tag().is_some()) {
            return Err(CoreError::AlreadySet {
                name: tagged.name.clone(),
                field: "tag",
                value: tagged.tag().unwrap_or_default().to_string(),
            });
        }

        for (record, tag) in records.iter_mut().zip(tags) {
            tracing::debug!(repo = %record.name, %tag, "generated tag");
            record.set_tag(tag)?;
        }
        Ok(())
    }
}

/// Generate the tag for `record` at `now`
pub fn generate_at(record: &RepoRecord, now: DateTime<Utc>) -> Result<String> {
    match record.tag_type {
        TagType::Calver => Ok(format!("{}-{}", calver(now), record.label)),
        TagType::Semver => {
            record.validate()?;
            let semver = record.semver.as_deref().unwrap_or_default().trim();
            Ok(format!("{}-{}", semver, record.label))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceRef;
    use chrono::TimeZone;

    fn fixed() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2022, 2, 16, 9, 18, 0).unwrap())
    }

    fn calver_record() -> RepoRecord {
        RepoRecord::new(
            "test1",
            SourceRef::Branch("develop".to_string()),
            "develop1",
            TagType::Calver,
        )
    }

    fn semver_record() -> RepoRecord {
        RepoRecord::new(
            "test2",
            SourceRef::Branch("release".to_string()),
            "release1",
            TagType::Semver,
        )
        .with_semver("1.2.4rc2")
    }

    #[test]
    fn test_calver_format() {
        assert_eq!(calver(fixed().0), "20220216-0918");
        let late = Utc.with_ymd_and_hms(2023, 11, 5, 23, 7, 59).unwrap();
        assert_eq!(calver(late), "20231105-2307");
    }

    #[test]
    fn test_generate_calver() {
        let generator = TagGenerator::new(fixed());
        assert_eq!(
            generator.generate(&calver_record()).unwrap(),
            "20220216-0918-develop1"
        );
    }

    #[test]
    fn test_generate_semver() {
        let generator = TagGenerator::new(fixed());
        assert_eq!(
            generator.generate(&semver_record()).unwrap(),
            "1.2.4rc2-release1"
        );
    }

    #[test]
    fn test_generate_is_deterministic() {
        let generator = TagGenerator::new(fixed());
        let first = generator.generate(&calver_record()).unwrap();
        let second = generator.generate(&calver_record()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_assign_batch() {
        let generator = TagGenerator::new(fixed());
        let mut records = vec![calver_record(), semver_record()];
        generator.assign(&mut records).unwrap();

        assert_eq!(records[0].tag(), Some("20220216-0918-develop1"));
        assert_eq!(records[1].tag(), Some("1.2.4rc2-release1"));
    }

    #[test]
    fn test_assign_is_all_or_nothing() {
        let generator = TagGenerator::new(fixed());
        let broken = RepoRecord::new(
            "test3",
            SourceRef::Branch("release".to_string()),
            "release1",
            TagType::Semver,
        );
        let mut records = vec![calver_record(), broken, semver_record()];

        let err = generator.assign(&mut records).unwrap_err();
        assert!(matches!(err, CoreError::MissingSemver { ref name } if name == "test3"));
        assert!(records.iter().all(|r| r.tag().is_none()));
    }

    #[test]
    fn test_assign_refuses_retagging_a_record() {
        let generator = TagGenerator::new(fixed());
        let mut tagged = calver_record();
        tagged.set_tag("existing").unwrap();
        let mut records = vec![semver_record(), tagged];

        assert!(generator.assign(&mut records).is_err());
        assert!(records[0].tag().is_none());
        assert_eq!(records[1].tag(), Some("existing"));
    }
}
