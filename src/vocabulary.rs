//! The fixed subject-tag vocabulary offered to the classifier.

/// Allowed subject tags, in presentation order. Never mutated at runtime.
const ALLOWED_TAGS: &[&str] = &[
    "Bibliography",
    "Introductions",
    "General studies and handbooks",
    "Collections",
    "State of Scholarship",
    "Personalia",
    "Significance",
    "Digital Tools",
    "Editions",
    "Commentaries",
    "Commentaries-Studies on",
    "Translations",
    "Translations-Studies on",
    "History and Origin of LXX",
    "Aristeas",
    "Aristeas-translations",
    "Aristeas-studies",
    "Theology & Interpretation",
    "Theology & Interpretation-Topical Studies in the LXX",
    "Theology & Interpretation-Biblical Theology and Theology of the LXX",
    "Theology & Interpretation-LXX Hermeneutics",
    "Theology & Interpretation-Intertextuality and the LXX",
    "Inspiration",
    "Canon",
    "Language",
    "Language-general",
    "Language-Grammars",
    "Language-Grammatical studies",
    "Language-Lexica",
    "Language-Concordances",
    "Language-Lexical studies",
    "Language-Lexical studies-NT",
    "Language-Influence of LXX language",
    "Translation Studies-general",
    "Translation Studies-biblical",
    "Translation Studies-technique",
    "God Humanized",
    "Names-Divine",
    "Names-Proper",
    "Names-Onomastica",
    "Transliterations",
    "Wutz's theory",
    "Textual Criticism",
    "Hebrew Bible",
    "DSS",
    "DSS-general",
    "DSS-specific",
    "Pseudepigrapha",
    "Targums",
    "Peshitta",
    "Rabbinic Literature",
    "NT",
    "NT- general",
    "NT-specific",
    "NT-testimonia",
    "Hellenistic exegesis",
    "Philo",
    "Josephus",
    "Witnesses",
    "Witnesses-general",
    "Witnesses-papyri",
    "Witnesses-manuscripts",
    "Witnesses-inscriptions",
    "Witnesses-Catenae",
    "Transmission",
    "Later history",
    "Later history-reception",
    "Later history-chronology",
    "Lectionaries",
    "Revisions",
    "Revisions-general",
    "Revisions-Theodotion",
    "Revisions-Aquila",
    "Revisions-Symmachus",
    "Revisions-Quinta",
    "Revisions-Samaritikon",
    "Revisions-Syros",
    "Revisions-others",
    "Revisions-Medieval Greek",
    "Revisions-Graecus Venetus",
    "Patristics",
    "Textual Studies",
    "Textual Studies-General",
    "Textual Studies-Corruptions",
    "Textual Studies-Recensions",
    "Textual Studies-Hebraising Recensions",
    "Textual Studies-Origen",
    "Textual Studies-Hexaplaric Recension",
    "Textual Studies-Hexapla",
    "Textual Studies-Tetrapla",
    "Textual Studies-Second Column",
    "Textual Studies-Lucianic Recension",
    "Textual Studies-Hesychian Recension",
    "Jerome",
    "Books",
    "Books-Pentateuch",
    "Books-Pentateuch-Genesis",
    "Books-Pentateuch-Exodus",
    "Books-Pentateuch-Leviticus",
    "Books-Pentateuch-Numbers",
    "Books-Pentateuch-Deuteronomy",
    "Books-Historical Books",
    "Books-Historical Books-Joshua",
    "Books-Historical Books-Judges",
    "Books-Historical Books-Ruth",
    "Books-Historical Books-Kingdoms",
    "Books-Historical Books-Kingdoms-general",
    "Books-Historical Books-Kingdoms-1 & 2",
    "Books-Historical Books-Kingdoms-3 & 4",
    "Books-Historical Books-Paraleipomena",
    "Books-Historical Books-Esdras",
    "Books-Historical Books-Esther",
    "Books-Historical Books-Judith",
    "Books-Historical Books-Tobit",
    "Books-Historical Books-Maccabees",
    "Books-Historical Books-Maccabees-general",
    "Books-Historical Books-Maccabees-1",
    "Books-Historical Books-Maccabees-2",
    "Books-Historical Books-Maccabees-3",
    "Books-Historical Books-Maccabees-4",
    "Books-Poetic-Psalms",
    "Books-Poetic-Odes & Psalm 151",
    "Books-Poetic-Proverbs",
    "Books-Poetic-Ecclesiastes",
    "Books-Poetic-Canticle",
    "Books-Poetic-Job",
    "Books-Poetic-Wisdom of Solomon",
    "Books-Poetic-Sirach",
    "Books-Poetic-Psalms of Solomon",
    "Books-Prophets",
    "Books-Prophets-Dodekaprophetai",
    "Books-Prophets-Dodekaprophetai-Hosea",
    "Books-Prophets-Dodekaprophetai-Amos",
    "Books-Prophets-Dodekaprophetai-Micah",
    "Books-Prophets-Dodekaprophetai-Joel",
    "Books-Prophets-Dodekaprophetai-Obadiah",
    "Books-Prophets-Dodekaprophetai-Jonah",
    "Books-Prophets-Dodekaprophetai-Nahum",
    "Books-Prophets-Dodekaprophetai-Habakkuk",
    "Books-Prophets-Dodekaprophetai-Zephaniah",
    "Books-Prophets-Dodekaprophetai-Haggai",
    "Books-Prophets-Dodekaprophetai-Zechariah",
    "Books-Prophets-Dodekaprophetai-Malachi",
    "Books-Prophets-Isaiah",
    "Books-Prophets-Jeremiah",
    "Books-Prophets-Lamentations",
    "Books-Prophets-Baruch",
    "Books-Prophets-Ezekiel",
    "Books-Prophets-Daniel",
    "Versions",
    "Versions-general",
    "Versions-arabic",
    "Versions-armenian",
    "Versions-coptic",
    "Versions-ethiopic",
    "Versions-georgian",
    "Versions-gothic",
    "Versions-latin",
    "Versions-slavonic",
    "Versions-syriac",
    "Versions-syro-hexapla",
    "Versions-Jacob of Edessa",
    "Illustration of the LXX",
];

/// An ordered, immutable set of allowed tag strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagVocabulary {
    tags: &'static [&'static str],
}

impl TagVocabulary {
    /// The built-in bibliography vocabulary.
    pub const fn builtin() -> Self {
        Self { tags: ALLOWED_TAGS }
    }

    /// A vocabulary over a caller-supplied static list.
    pub const fn from_static(tags: &'static [&'static str]) -> Self {
        Self { tags }
    }

    /// Tags in order.
    pub fn tags(&self) -> &'static [&'static str] {
        self.tags
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Newline-separated rendering embedded in the classification prompt.
    pub fn render(&self) -> String {
        self.tags.join("\n")
    }
}

impl Default for TagVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}
