use super::types::{Chunk, Document};

/// Separators tried in order by [`SplitStrategy::Recursive`]; the empty one splits into chars.
const RECURSIVE_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Split on paragraphs, then lines, then words, then characters.
    #[default]
    Recursive,
    /// Split on sentence endings and paragraph breaks.
    Sentence,
    /// Fixed-size character windows.
    Chars,
}

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk.
    pub chunk_overlap: usize,
    pub strategy: SplitStrategy,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 50,
            strategy: SplitStrategy::Recursive,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split one document. Chunk indices start at 0 and inherit the document metadata.
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                content,
                metadata: document.metadata.clone(),
                chunk_index: i,
            })
            .collect()
    }

    /// Split every document in order.
    #[must_use]
    pub fn split_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|d| self.split(d)).collect()
    }

    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let SplitterConfig {
            chunk_size,
            chunk_overlap,
            strategy,
        } = self.config;
        let chunk_size = chunk_size.max(1);

        match strategy {
            SplitStrategy::Recursive => {
                split_recursive(text, &RECURSIVE_SEPARATORS, chunk_size, chunk_overlap)
            }
            SplitStrategy::Sentence => {
                merge_sentences(&split_sentences(text), chunk_size, chunk_overlap)
            }
            SplitStrategy::Chars => split_chars(text, chunk_size, chunk_overlap),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on the first separator present in `text`, recursing with the finer
/// separators into any piece that is still too long.
fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let (separator, finer) = separators
        .iter()
        .position(|s| s.is_empty() || text.contains(s))
        .map_or(("", &[][..]), |i| (separators[i], &separators[i + 1..]));

    let mut chunks = Vec::new();
    let mut fitting: Vec<String> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(&piece) < chunk_size {
            fitting.push(piece);
            continue;
        }
        if !fitting.is_empty() {
            chunks.extend(merge_pieces(&fitting, chunk_size, chunk_overlap));
            fitting.clear();
        }
        if finer.is_empty() {
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_owned());
            }
        } else {
            chunks.extend(split_recursive(&piece, finer, chunk_size, chunk_overlap));
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, chunk_size, chunk_overlap));
    }
    chunks
}

/// Pieces of `text` with each separator occurrence kept at the start of the following piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(text[start..idx].to_owned());
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(text[start..].to_owned());
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Greedily join pieces up to `chunk_size` chars, carrying up to `chunk_overlap`
/// chars of the trailing pieces into the next chunk.
fn merge_pieces(pieces: &[String], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: std::collections::VecDeque<(&str, usize)> = std::collections::VecDeque::new();
    let mut total = 0;

    let mut emit = |window: &std::collections::VecDeque<(&str, usize)>| {
        let joined: String = window.iter().map(|(p, _)| *p).collect();
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_owned());
        }
    };

    for piece in pieces {
        let len = char_len(piece);
        if total + len > chunk_size && !window.is_empty() {
            emit(&window);
            while total > chunk_overlap || (total > 0 && total + len > chunk_size) {
                let Some((_, dropped)) = window.pop_front() else {
                    break;
                };
                total -= dropped;
            }
        }
        window.push_back((piece.as_str(), len));
        total += len;
    }

    if !window.is_empty() {
        emit(&window);
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        current.push(chars[i]);

        if chars[i] == '\n' && i + 1 < chars.len() && chars[i + 1] == '\n' {
            current.push(chars[i + 1]);
            i += 1;
            if !current.trim().is_empty() {
                sentences.push(std::mem::take(&mut current));
            }
        } else if matches!(chars[i], '.' | '?' | '!')
            && i + 1 < chars.len()
            && chars[i + 1] == ' '
            && !current.trim().is_empty()
        {
            sentences.push(std::mem::take(&mut current));
        }

        i += 1;
    }

    if !current.trim().is_empty() {
        sentences.push(current);
    }

    sentences
}

fn merge_sentences(sentences: &[String], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut window_start = 0;

    for (idx, sentence) in sentences.iter().enumerate() {
        let len = char_len(sentence);
        if !current.is_empty() && current_len + len > chunk_size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;

            let mut overlap_len = 0;
            let mut overlap_start = idx;
            for i in (window_start..idx).rev() {
                let prev = char_len(&sentences[i]);
                if overlap_len + prev > chunk_overlap {
                    break;
                }
                overlap_len += prev;
                overlap_start = i;
            }
            for s in &sentences[overlap_start..idx] {
                current.push_str(s);
            }
            current_len = overlap_len;
            window_start = overlap_start;
        }

        current.push_str(sentence);
        current_len += len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_chars(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::types::DocumentMetadata;

    fn make_doc(content: &str) -> Document {
        Document {
            content: content.to_owned(),
            metadata: DocumentMetadata::new("test", "text/plain").with_page(3),
        }
    }

    fn splitter(chunk_size: usize, chunk_overlap: usize, strategy: SplitStrategy) -> TextSplitter {
        TextSplitter::new(SplitterConfig {
            chunk_size,
            chunk_overlap,
            strategy,
        })
    }

    #[test]
    fn default_config() {
        let config = SplitterConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.strategy, SplitStrategy::Recursive);
    }

    #[test]
    fn empty_document() {
        let chunks = TextSplitter::new(SplitterConfig::default()).split(&make_doc(""));
        assert!(chunks.is_empty());
    }

    #[test]
    fn whitespace_only_document_yields_nothing() {
        let chunks = TextSplitter::new(SplitterConfig::default()).split(&make_doc(" \n\n \n"));
        assert!(chunks.is_empty());
    }

    #[test]
    fn short_document_single_trimmed_chunk() {
        let chunks =
            TextSplitter::new(SplitterConfig::default()).split(&make_doc("  Short text.\n"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Short text.");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn metadata_preserved() {
        let chunks = TextSplitter::new(SplitterConfig::default()).split(&make_doc("Content."));
        assert_eq!(chunks[0].metadata.source, "test");
        assert_eq!(chunks[0].metadata.page, Some(3));
    }

    #[test]
    fn recursive_merges_words_without_overlap() {
        let chunks = splitter(10, 0, SplitStrategy::Recursive).split_text("aaaa bbbb cccc");
        assert_eq!(chunks, ["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn recursive_carries_overlap_into_next_chunk() {
        let chunks = splitter(10, 5, SplitStrategy::Recursive).split_text("aaaa bbbb cccc");
        assert_eq!(chunks, ["aaaa bbbb", "bbbb cccc"]);
    }

    #[test]
    fn recursive_prefers_paragraph_boundaries() {
        let text = "Fever is a symptom.\n\nCough is another symptom.";
        let chunks = splitter(30, 0, SplitStrategy::Recursive).split_text(text);
        assert_eq!(chunks, ["Fever is a symptom.", "Cough is another symptom."]);
    }

    #[test]
    fn recursive_falls_back_to_chars_for_long_words() {
        let chunks = splitter(4, 0, SplitStrategy::Recursive).split_text("abcdefghij");
        assert_eq!(chunks, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn recursive_counts_chars_not_bytes() {
        let chunks = splitter(3, 0, SplitStrategy::Recursive).split_text("äöüß");
        assert_eq!(chunks, ["äöü", "ß"]);
    }

    #[test]
    fn split_keeping_separator_prefixes_following_piece() {
        let pieces = split_keeping_separator("a\nb\nc", "\n");
        assert_eq!(pieces, ["a", "\nb", "\nc"]);
    }

    #[test]
    fn split_all_keeps_per_document_indices() {
        let docs = [make_doc("one two"), make_doc("three four")];
        let chunks = splitter(5, 0, SplitStrategy::Recursive).split_all(&docs);
        let indices: Vec<_> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, [0, 1, 0, 1]);
    }

    #[test]
    fn sentence_splitting() {
        let text = "First sentence. Second sentence. Third sentence.";
        let chunks = splitter(20, 5, SplitStrategy::Sentence).split(&make_doc(text));
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }
    }

    #[test]
    fn paragraph_break_splitting() {
        assert_eq!(split_sentences("First paragraph.\n\nSecond paragraph.").len(), 2);
    }

    #[test]
    fn question_and_exclamation_split_sentences() {
        assert_eq!(split_sentences("Is this a question? Yes it is.").len(), 2);
        assert_eq!(split_sentences("Wow! Amazing.").len(), 2);
    }

    #[test]
    fn char_splitting_with_overlap() {
        let chunks = splitter(10, 3, SplitStrategy::Chars).split_text("abcdefghijklmnopqrstuvwxyz");
        assert!(chunks.len() > 1);
        assert_eq!(&chunks[0][7..10], &chunks[1][..3]);
    }

    #[test]
    fn char_split_no_overlap() {
        assert_eq!(split_chars("abcdefghij", 5, 0), ["abcde", "fghij"]);
    }

    #[test]
    fn char_split_full_overlap_makes_progress() {
        let chunks = split_chars("abcde", 3, 3);
        assert_eq!(chunks[0], "abc");
        assert_eq!(chunks.last().map(String::as_str), Some("cde"));
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        fn strategy() -> impl Strategy<Value = SplitStrategy> {
            prop_oneof![
                Just(SplitStrategy::Recursive),
                Just(SplitStrategy::Sentence),
                Just(SplitStrategy::Chars),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn split_never_panics(
                content in "\\PC{0,3000}",
                chunk_size in 1usize..2000,
                chunk_overlap in 0usize..500,
                strategy in strategy(),
            ) {
                let _ = splitter(chunk_size, chunk_overlap, strategy).split(&make_doc(&content));
            }

            #[test]
            fn split_is_deterministic(
                content in "[a-z .\n]{0,1500}",
                chunk_size in 1usize..300,
                chunk_overlap in 0usize..100,
                strategy in strategy(),
            ) {
                let s = splitter(chunk_size, chunk_overlap, strategy);
                prop_assert_eq!(s.split_text(&content), s.split_text(&content));
            }

            #[test]
            fn recursive_chunks_fit_chunk_size(
                content in "[a-z .\n]{1,2000}",
                chunk_size in 1usize..300,
                chunk_overlap in 0usize..100,
            ) {
                let chunks = splitter(chunk_size, chunk_overlap, SplitStrategy::Recursive)
                    .split_text(&content);
                for chunk in &chunks {
                    prop_assert!(chunk.chars().count() <= chunk_size);
                    prop_assert!(!chunk.trim().is_empty());
                    prop_assert_eq!(chunk.trim(), chunk.as_str());
                }
            }

            #[test]
            fn recursive_keeps_every_word(
                words in proptest::collection::vec("[a-z]{1,8}", 1..200),
                chunk_size in 10usize..200,
            ) {
                let content = words.join(" ");
                let chunks = splitter(chunk_size, 0, SplitStrategy::Recursive)
                    .split_text(&content);
                let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
                prop_assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
            }

            #[test]
            fn chars_cover_all_content(
                content in "[a-z ]{10,500}",
                chunk_size in 10usize..200,
            ) {
                let chunks = splitter(chunk_size, 0, SplitStrategy::Chars).split_text(&content);
                prop_assert_eq!(chunks.concat(), content);
            }

            #[test]
            fn chunk_indices_sequential(
                content in "[a-z. ]{10,1000}",
                chunk_size in 5usize..100,
                strategy in strategy(),
            ) {
                let chunks = splitter(chunk_size, 0, strategy).split(&make_doc(&content));
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.chunk_index, i);
                }
            }
        }
    }
}
