use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

selector!(ANCHOR_SELECTOR, "a[href]");
// Archive root: one link per month that has snapshots, e.g. `./?year=2017&month=1`.
regex!(MONTH_LINK_REGEX, r"[?&]year=(\d{4})&month=(\d{1,2})(?:$|&|#)");
// Month page: one link per snapshot, e.g. `20170101T034501Z/`.
regex!(SNAPSHOT_LINK_REGEX, r"(?:^|/)(\d{8}T\d{6}Z)/?$");

pub(crate) const SOURCE_TEMPLATE: &str = "{{ base }}{{ timestamp }}/dists/{{ suite }}/{{ component }}/source/{{ index }}";
pub(crate) const BINARY_TEMPLATE: &str =
    "{{ base }}{{ timestamp }}/dists/{{ suite }}/{{ component }}/binary-{{ architecture }}/{{ index }}";
pub(crate) const MONTH_TEMPLATE: &str = "{{ base }}?year={{ year }}&month={{ month }}";
