//! 단어 단위 diff.
//!
//! 공통 접두/접미를 잘라낸 뒤 나머지 구간에 LCS를 적용한다.
//! 같은 간극 안에서는 삭제 구간이 삽입 구간보다 먼저 나온다.

/// 편집 연산 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTag {
    Equal,
    Insert,
    Delete,
}

/// 연속된 같은 종류의 단어 묶음
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOp {
    pub tag: DiffTag,
    pub words: Vec<String>,
}

/// 두 텍스트를 공백 기준으로 나눠 단어 편집 스크립트를 만든다
pub fn diff_words(prev: &str, curr: &str) -> Vec<DiffOp> {
    let a: Vec<&str> = prev.split_whitespace().collect();
    let b: Vec<&str> = curr.split_whitespace().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut ops = Vec::new();
    push(&mut ops, DiffTag::Equal, &a[..prefix]);
    lcs_script(
        &a[prefix..a.len() - suffix],
        &b[prefix..b.len() - suffix],
        &mut ops,
    );
    push(&mut ops, DiffTag::Equal, &a[a.len() - suffix..]);
    ops
}

fn lcs_script(a: &[&str], b: &[&str], ops: &mut Vec<DiffOp>) {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        push(ops, DiffTag::Delete, a);
        push(ops, DiffTag::Insert, b);
        return;
    }

    // lengths[i][j] = a[i..], b[j..]의 LCS 길이
    let width = m + 1;
    let mut lengths = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i * width + j] = if a[i] == b[j] {
                lengths[(i + 1) * width + j + 1] + 1
            } else {
                lengths[(i + 1) * width + j].max(lengths[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    let mut deleted: Vec<&str> = Vec::new();
    let mut inserted: Vec<&str> = Vec::new();
    while i < n && j < m {
        if a[i] == b[j] {
            flush_gap(ops, &mut deleted, &mut inserted);
            push(ops, DiffTag::Equal, &a[i..=i]);
            i += 1;
            j += 1;
        } else if lengths[(i + 1) * width + j] >= lengths[i * width + j + 1] {
            deleted.push(a[i]);
            i += 1;
        } else {
            inserted.push(b[j]);
            j += 1;
        }
    }
    deleted.extend_from_slice(&a[i..]);
    inserted.extend_from_slice(&b[j..]);
    flush_gap(ops, &mut deleted, &mut inserted);
}

fn flush_gap(ops: &mut Vec<DiffOp>, deleted: &mut Vec<&str>, inserted: &mut Vec<&str>) {
    push(ops, DiffTag::Delete, deleted);
    push(ops, DiffTag::Insert, inserted);
    deleted.clear();
    inserted.clear();
}

/// 같은 종류의 직전 연산이 있으면 이어 붙인다
fn push(ops: &mut Vec<DiffOp>, tag: DiffTag, words: &[&str]) {
    if words.is_empty() {
        return;
    }
    match ops.last_mut() {
        Some(last) if last.tag == tag => {
            last.words.extend(words.iter().map(|w| w.to_string()));
        }
        _ => ops.push(DiffOp {
            tag,
            words: words.iter().map(|w| w.to_string()).collect(),
        }),
    }
}
