//! Helpers that prepare inputs and names for a batch of branches.

use crate::branch::Branch;
use crate::core::Value;
use crate::errors::DispatchError;

/// Checks that every sequence has the same length.
pub fn check_sequence_lengths<T>(sequences: &[&[T]]) -> Result<(), DispatchError> {
    check_lengths(sequences.iter().map(|seq| seq.len()).collect())
}

fn check_lengths(lengths: Vec<usize>) -> Result<(), DispatchError> {
    if lengths.windows(2).any(|pair| pair[0] != pair[1]) {
        return Err(DispatchError::UnequalLengths { lengths });
    }
    Ok(())
}

/// Appends the i-th item of every sequence to the i-th base stream.
pub fn add_sequences(
    base: Vec<Vec<Value>>,
    sequences: &[Vec<Value>],
) -> Result<Vec<Vec<Value>>, DispatchError> {
    let lengths = std::iter::once(base.len())
        .chain(sequences.iter().map(Vec::len))
        .collect();
    check_lengths(lengths)?;

    Ok(base
        .into_iter()
        .enumerate()
        .map(|(index, mut stream)| {
            stream.extend(sequences.iter().map(|seq| seq[index].clone()));
            stream
        })
        .collect())
}

/// Builds one initial stream per branch.
///
/// `for_all` is shared by every branch: absent means nothing, a tuple or
/// list contributes its items, any other value contributes itself. The
/// i-th item of every `for_each` sequence follows.
pub fn create_init_data_sequence(
    len: usize,
    for_all: Option<&Value>,
    for_each: &[Vec<Value>],
) -> Result<Vec<Value>, DispatchError> {
    let shared = match for_all {
        None => Vec::new(),
        Some(value) => value
            .as_items()
            .map_or_else(|| vec![value.clone()], <[Value]>::to_vec),
    };
    let base = vec![shared; len];
    let streams = if for_each.is_empty() {
        base
    } else {
        add_sequences(base, for_each)?
    };
    Ok(streams.into_iter().map(Value::Tuple).collect())
}

/// Prefixes every branch name with `"{job} -> "`.
pub fn update_branch_names(job: &str, branches: Vec<Branch>) -> Vec<Branch> {
    branches
        .into_iter()
        .map(|branch| {
            let name = format!("{job} -> {}", branch.name());
            branch.with_name(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_check_sequence_lengths() {
        assert!(check_sequence_lengths::<i32>(&[]).is_ok());
        assert!(check_sequence_lengths(&[&[1, 2][..], &[3, 4][..]]).is_ok());

        let err = check_sequence_lengths(&[&[1, 2][..], &[3][..]]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The lengths of the sequences are not equal to each other: [2, 1]"
        );
    }

    #[test]
    fn test_add_sequences() {
        let base = vec![vec![Value::from("a")], vec![Value::from("b")]];
        let combined = add_sequences(base, &[vec![Value::Int(1), Value::Int(2)]]).unwrap();
        assert_eq!(
            combined,
            vec![
                vec![Value::from("a"), Value::Int(1)],
                vec![Value::from("b"), Value::Int(2)],
            ]
        );
    }

    #[test]
    fn test_init_data_without_inputs() {
        let streams = create_init_data_sequence(2, None, &[]).unwrap();
        assert_eq!(streams, vec![tuple![], tuple![]]);
    }

    #[test]
    fn test_init_data_scalar_for_all() {
        let streams = create_init_data_sequence(2, Some(&Value::Int(5)), &[]).unwrap();
        assert_eq!(streams, vec![tuple![5], tuple![5]]);
    }

    #[test]
    fn test_init_data_for_all_and_for_each() {
        let streams = create_init_data_sequence(
            3,
            Some(&Value::list(["job", "2"])),
            &[vec![Value::Int(1), Value::Int(2), Value::Int(3)]],
        )
        .unwrap();
        assert_eq!(
            streams,
            vec![
                tuple!["job", "2", 1],
                tuple!["job", "2", 2],
                tuple!["job", "2", 3],
            ]
        );
    }

    #[test]
    fn test_init_data_length_mismatch() {
        let err = create_init_data_sequence(3, None, &[vec![Value::Int(1)]]).unwrap_err();
        assert_eq!(err, DispatchError::UnequalLengths { lengths: vec![3, 1] });
    }

    #[test]
    fn test_update_branch_names() {
        let renamed = update_branch_names(
            "trusted_to_enriched",
            vec![Branch::new("dim_role"), Branch::default()],
        );
        let names: Vec<&str> = renamed.iter().map(Branch::name).collect();
        assert_eq!(
            names,
            vec![
                "trusted_to_enriched -> dim_role",
                "trusted_to_enriched -> BRANCH NAME NOT DEFINED",
            ]
        );
    }
}
