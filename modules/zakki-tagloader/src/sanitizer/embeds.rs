//! Trusted embed providers.
//!
//! An iframe `src` outside the archive survives only when it matches one of
//! these patterns exactly. Adding a provider means adding a row here.

use std::sync::LazyLock;

use regex::Regex;

/// Query strings allowed after an embed path.
const QUERY: &str = r"(?:\?[A-Za-z0-9_=&;%.\-]*)?";

const PROVIDERS: &[(&str, &[&str])] = &[
    (
        "youtube",
        &[
            r"^https://www\.youtube\.com/embed/[A-Za-z0-9_\-]+{Q}$",
            r"^https://www\.youtube-nocookie\.com/embed/[A-Za-z0-9_\-]+{Q}$",
        ],
    ),
    (
        "spotify",
        &[r"^https://open\.spotify\.com/embed/(?:track|album|playlist|episode|show|artist)/[A-Za-z0-9]+{Q}$"],
    ),
    (
        "soundcloud",
        &[r"^https://w\.soundcloud\.com/player/\?[A-Za-z0-9_=&;%.:/\-]+$"],
    ),
    (
        "niconico",
        &[r"^https://embed\.nicovideo\.jp/watch/[a-z]{2}[0-9]+{Q}$"],
    ),
];

static REGISTRY: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    PROVIDERS
        .iter()
        .map(|(name, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(&p.replace("{Q}", QUERY)).expect("valid regex"))
                .collect();
            (*name, compiled)
        })
        .collect()
});

/// Name of the provider whose pattern `src` matches.
pub fn trusted_provider(src: &str) -> Option<&'static str> {
    REGISTRY
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(src)))
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_players_match() {
        assert_eq!(trusted_provider("https://www.youtube.com/embed/abc123"), Some("youtube"));
        assert_eq!(
            trusted_provider("https://www.youtube-nocookie.com/embed/abc123?start=30"),
            Some("youtube")
        );
        assert_eq!(
            trusted_provider("https://open.spotify.com/embed/track/4uLU6hMCjMI75M1A2tKUQC"),
            Some("spotify")
        );
        assert_eq!(
            trusted_provider("https://w.soundcloud.com/player/?url=https%3A//api.soundcloud.com/tracks/1"),
            Some("soundcloud")
        );
        assert_eq!(trusted_provider("https://embed.nicovideo.jp/watch/sm9"), Some("niconico"));
    }

    #[test]
    fn lookalikes_do_not_match() {
        for src in [
            "https://evil.example/x",
            "http://www.youtube.com/embed/abc123",
            "https://www.youtube.com.evil.example/embed/abc123",
            "https://www.youtube.com/watch?v=abc123",
            "https://www.youtube.com/embed/abc123\"onload=\"x",
            "https://evil.example/?u=https://www.youtube.com/embed/abc123",
            "https://open.spotify.com/embed/track/../../x",
        ] {
            assert_eq!(trusted_provider(src), None, "{src}");
        }
    }
}
