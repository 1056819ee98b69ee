use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::models::ParsedName;

const MOVIE_PATTERN: &str = r"^(?P<movie>.*)[.\[( ](?P<year>(?:19|20)\d{2})";

struct EpisodePattern {
    name: &'static str,
    regex: Regex,
}

static MOVIE: Lazy<Regex> = Lazy::new(|| Regex::new(MOVIE_PATTERN).expect("valid movie pattern"));

// Evaluated top to bottom, the first match wins. Conventions overlap, so the
// order decides which reading is preferred.
static EPISODE_PATTERNS: Lazy<Vec<EpisodePattern>> = Lazy::new(|| {
    [
        // foo.s0101
        (
            "compact-s",
            r"^(?P<show>.+?)[ \._\-][Ss](?P<season>[0-9]{2})[ \.\-]?(?P<episode>[0-9]{2})[^0-9]*$",
        ),
        // foo.1x09
        (
            "cross",
            r"^(?P<show>.+?)[ ._-]\[?(?P<season>[0-9]+)[xX](?P<episode>[0-9]+)\]?[^/]*$",
        ),
        // foo - [01.09]
        (
            "bracketed",
            r"^(?P<show>.+?)[ \._\-]?\[(?P<season>[0-9]+?)[.](?P<episode>[0-9]+?)\][ \._\-]?[^/]*$",
        ),
        // Foo - S2 E 02, Show.S01E09
        (
            "season-episode",
            r"^(?P<show>.+?)[ ]?[ \._\-][ ]?[Ss](?P<season>[0-9]+)[\.\- ]?[Ee]?[ ]?(?P<episode>[0-9]+)[^\/]*$",
        ),
        // Show - Episode 9999 [S 12 - Ep 131]
        (
            "absolute-episode",
            r"(?P<show>.+)[ ]-[ ][Ee]pisode[ ]\d+[ ]\[[sS][ ]?(?P<season>\d+)([ ]|[ ]-[ ]|-)([eE]|[eE]p)[ ]?(?P<episode>\d+)\].*$",
        ),
        // foo.103
        (
            "three-digit",
            r"^(?P<show>.+)[ \._\-](?P<season>[0-9]{1})(?P<episode>[0-9]{2})[\._ -][^\/]*$",
        ),
        // foo.s01.e01, foo.s01_e01
        (
            "split-s-e",
            r"^(?P<show>.+?)[ \._\-]\[?[Ss](?P<season>[0-9]+)[\. _-]?[Ee]?(?P<episode>[0-9]+)\]?[^\/]*$",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| EpisodePattern {
        name,
        regex: Regex::new(pattern).expect("valid episode pattern"),
    })
    .collect()
});

/// Guesses whether `filename` names a movie or an episode.
///
/// A year anywhere after the title makes it a movie and the episode patterns
/// are not consulted. Otherwise the first episode pattern that matches decides,
/// even when its numbers turn out unusable.
pub fn classify(filename: &str) -> ParsedName {
    if let Some(caps) = MOVIE.captures(filename) {
        let raw_title = caps
            .name("movie")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let year = caps
            .name("year")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or_default();
        return ParsedName::MovieGuess { raw_title, year };
    }

    let Some((pattern, caps)) = EPISODE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.regex.captures(filename).map(|caps| (pattern, caps)))
    else {
        return ParsedName::Unclassified;
    };
    tracing::trace!(pattern = pattern.name, filename, "Episode pattern matched");
    episode_from_captures(&caps).unwrap_or(ParsedName::Unclassified)
}

fn episode_from_captures(caps: &Captures) -> Option<ParsedName> {
    let show = caps.name("show")?.as_str();
    if show.is_empty() {
        return None;
    }
    // Digit groups too long for u32 leave the name unclassified.
    let season = caps.name("season")?.as_str().parse().ok()?;
    let episode = caps.name("episode")?.as_str().parse().ok()?;
    Some(ParsedName::EpisodeGuess {
        show: show.to_string(),
        season,
        episode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(show: &str, season: u32, episode: u32) -> ParsedName {
        ParsedName::EpisodeGuess {
            show: show.to_string(),
            season,
            episode,
        }
    }

    fn pattern_index(name: &str) -> usize {
        EPISODE_PATTERNS
            .iter()
            .position(|p| p.name == name)
            .unwrap()
    }

    #[test]
    fn test_sxxexx_episode() {
        assert_eq!(
            classify("Show.Name.S01E02.mkv"),
            episode("Show.Name", 1, 2)
        );
    }

    #[test]
    fn test_cross_episode() {
        assert_eq!(classify("Show.1x09.Title.avi"), episode("Show", 1, 9));
    }

    #[test]
    fn test_movie_with_year() {
        assert_eq!(
            classify("Movie.Title.2015.mkv"),
            ParsedName::MovieGuess {
                raw_title: "Movie.Title".to_string(),
                year: 2015
            }
        );
    }

    #[test]
    fn test_movie_wins_over_episode_patterns() {
        // S01E02 would satisfy an episode pattern, the year short-circuits it
        assert!(matches!(
            classify("Show (2010) S01E02.mkv"),
            ParsedName::MovieGuess { year: 2010, .. }
        ));
    }

    #[test]
    fn test_unclassified() {
        assert_eq!(classify("randomfile.mkv"), ParsedName::Unclassified);
        assert_eq!(classify(""), ParsedName::Unclassified);
    }

    #[test]
    fn test_compact_s_form() {
        assert_eq!(classify("foo.s0103.avi"), episode("foo", 1, 3));
    }

    #[test]
    fn test_bracketed_form() {
        assert_eq!(classify("Show - [01.09].avi"), episode("Show -", 1, 9));
    }

    #[test]
    fn test_spaced_season_episode() {
        assert_eq!(classify("Show S2 E02.mkv"), episode("Show", 2, 2));
    }

    #[test]
    fn test_absolute_episode_form() {
        assert_eq!(
            classify("Show - Episode 9 [S12-Ep131].mkv"),
            episode("Show", 12, 131)
        );
    }

    #[test]
    fn test_dotted_s_e_prefers_season_episode_pattern() {
        assert_eq!(classify("show.s01.e01.mkv"), episode("show", 1, 1));
        assert_eq!(
            classify("Some Show - 2x05 - Title.avi"),
            episode("Some Show -", 2, 5)
        );
    }

    #[test]
    fn test_three_digit_form() {
        assert_eq!(classify("Show.103.avi"), episode("Show", 1, 3));
    }

    #[test]
    fn test_split_s_e_form() {
        assert_eq!(classify("show.[s01e01].mkv"), episode("show", 1, 1));
    }

    #[test]
    fn test_lower_index_wins_when_two_patterns_match() {
        let name = "Show.1x02.s03.e04.mkv";
        let cross = &EPISODE_PATTERNS[pattern_index("cross")];
        let split = &EPISODE_PATTERNS[pattern_index("split-s-e")];
        assert_eq!(pattern_index("cross"), 1);
        assert_eq!(pattern_index("split-s-e"), 6);

        // both interpretations are possible
        assert!(cross.regex.is_match(name));
        let later = split.regex.captures(name).unwrap();
        assert_eq!(episode_from_captures(&later), Some(episode("Show.1x02", 3, 4)));

        assert_eq!(classify(name), episode("Show", 1, 2));
    }

    #[test]
    fn test_oversized_digit_group_is_unclassified() {
        assert_eq!(
            classify("Show.1x99999999999.avi"),
            ParsedName::Unclassified
        );
    }

    #[test]
    fn test_oversized_match_does_not_try_later_patterns() {
        let name = "Show.1x99999999999.s01e02.avi";
        // a later pattern would read this fine on its own
        let season_episode = &EPISODE_PATTERNS[3];
        assert_eq!(season_episode.name, "season-episode");
        assert!(season_episode.regex.is_match(name));

        assert_eq!(classify(name), ParsedName::Unclassified);
    }

    #[test]
    fn test_pattern_table_order() {
        let names: Vec<&str> = EPISODE_PATTERNS.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "compact-s",
                "cross",
                "bracketed",
                "season-episode",
                "absolute-episode",
                "three-digit",
                "split-s-e"
            ]
        );
    }
}
