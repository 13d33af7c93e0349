//! Index URL construction.
//!
//! Snapshot URLs follow the archive layout
//! `<base><timestamp>/dists/<suite>/<component>/...`, rendered from [upon]
//! templates so that the suite, component and architecture come straight
//! from the [`ArchiveConfig`].

use crate::consts;
use crate::error::{ErrorKind, Result};
use debsnap_cache::{SnapshotRef, Timestamp};
use debsnap_config::ArchiveConfig;
use exn::ResultExt;
use upon::{Engine, Template};

pub(crate) struct UrlBuilder<'a> {
    engine: Engine<'static>,
    source: Template<'static>,
    binary: Template<'static>,
    month: Template<'static>,
    archive: &'a ArchiveConfig,
    base: String,
}

impl<'a> UrlBuilder<'a> {
    pub(crate) fn new(archive: &'a ArchiveConfig) -> Result<Self> {
        let engine = Engine::new();
        let source = engine.compile(consts::SOURCE_TEMPLATE).or_raise(|| ErrorKind::Template)?;
        let binary = engine.compile(consts::BINARY_TEMPLATE).or_raise(|| ErrorKind::Template)?;
        let month = engine.compile(consts::MONTH_TEMPLATE).or_raise(|| ErrorKind::Template)?;
        Ok(Self {
            engine,
            source,
            binary,
            month,
            archive,
            base: format!("{}/", archive.base_url.trim().trim_end_matches('/')),
        })
    }

    /// Archive root, always with a trailing slash.
    pub(crate) fn base(&self) -> &str {
        &self.base
    }

    pub(crate) fn month(&self, year: i32, month: u8) -> Result<String> {
        let parameters = upon::value! { base: self.base.as_str(), year: year, month: month };
        self.month.render(&self.engine, parameters).to_string().or_raise(|| ErrorKind::Template)
    }

    pub(crate) fn snapshot(&self, timestamp: Timestamp) -> Result<SnapshotRef> {
        let source = self.render(&self.source, timestamp, &self.archive.source_index)?;
        let binary = self.render(&self.binary, timestamp, &self.archive.binary_index)?;
        Ok(SnapshotRef::new(timestamp, source, binary))
    }

    fn render(&self, template: &Template<'static>, timestamp: Timestamp, index: &str) -> Result<String> {
        let parameters = upon::value! {
            base: self.base.as_str(),
            timestamp: timestamp.to_snapshot_string(),
            suite: self.archive.suite.as_str(),
            component: self.archive.component.as_str(),
            architecture: self.archive.architecture.as_str(),
            index: index,
        };
        template.render(&self.engine, parameters).to_string().or_raise(|| ErrorKind::Template)
    }
}
