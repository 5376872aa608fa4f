use ndarray::Array3;

use super::dictionary::CharacterDictionary;

/// One decoded recognition: text plus a confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub confidence: f64,
}

/// CTC greedy decode of `logits` (`N, T, V`): argmax each timestep,
/// collapse consecutive repeats, drop blanks (index 0), map through the
/// dictionary. Confidence is the geometric mean of the max-probability
/// at each timestep that survived collapsing; an all-blank row decodes
/// to `("", 0.0)`.
pub fn postprocess(logits: &Array3<f32>, dictionary: &CharacterDictionary) -> Vec<Recognition> {
    let (n, t, _v) = logits.dim();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let mut text = String::new();
        let mut kept_probs: Vec<f64> = Vec::new();
        let mut last_index: Option<usize> = None;

        for ts in 0..t {
            let row = logits.index_axis(ndarray::Axis(0), i);
            let row = row.index_axis(ndarray::Axis(0), ts);
            let (max_index, max_value) = row
                .iter()
                .enumerate()
                .fold((0usize, f32::MIN), |(bi, bv), (idx, &v)| if v > bv { (idx, v) } else { (bi, bv) });

            if last_index == Some(max_index) {
                continue;
            }
            last_index = Some(max_index);

            if max_index == 0 {
                continue;
            }
            if let Some(token) = dictionary.token(max_index) {
                text.push_str(token);
                kept_probs.push(max_value as f64);
            }
        }

        let confidence = if kept_probs.is_empty() {
            0.0
        } else {
            let log_sum: f64 = kept_probs.iter().map(|p| p.max(1e-12).ln()).sum();
            (log_sum / kept_probs.len() as f64).exp()
        };

        out.push(Recognition { text, confidence });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds logits where, at each timestep, `argmax_index` gets
    /// probability 1.0 and everything else gets 0.0.
    fn logits_from_sequence(seq: &[usize], v: usize) -> Array3<f32> {
        let t = seq.len();
        let mut logits = Array3::<f32>::zeros((1, t, v));
        for (ts, &idx) in seq.iter().enumerate() {
            logits[[0, ts, idx]] = 1.0;
        }
        logits
    }

    #[test]
    fn ctc_greedy_collapses_repeats_and_drops_blanks() {
        // blank=0, a=1, c=2, d=3 -> sequence "b a a b c c c b d" decodes "acd".
        let dict = CharacterDictionary::from_lines(vec!["a".into(), "c".into(), "d".into()]);
        let seq = [0, 1, 1, 0, 2, 2, 2, 0, 3];
        let logits = logits_from_sequence(&seq, dict.alphabet_size());
        let decoded = postprocess(&logits, &dict);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].text, "acd");
        assert!((decoded[0].confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn all_blank_decodes_to_empty_with_zero_confidence() {
        let dict = CharacterDictionary::from_lines(vec!["a".into()]);
        let seq = [0, 0, 0];
        let logits = logits_from_sequence(&seq, dict.alphabet_size());
        let decoded = postprocess(&logits, &dict);
        assert_eq!(decoded[0].text, "");
        assert_eq!(decoded[0].confidence, 0.0);
    }
}
