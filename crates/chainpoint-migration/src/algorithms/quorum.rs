//! # Mirror Quorum Rule
//!
//! Untrusted mirrors are cross-checked: the first value returned by two of
//! them wins. This is a same-answer-twice rule, not a majority vote.

use serde::Serialize;

use crate::domain::ConversionError;

/// Pick the first response that recurs, in arrival order.
///
/// Responses are compared by their JSON serialization so structured values
/// agree field by field.
///
/// # Errors
/// `QuorumNotReached` when no value is seen twice.
pub fn check_quorum<T: Serialize>(responses: Vec<T>, fact: &str) -> Result<T, ConversionError> {
    let total = responses.len();
    let mut seen: Vec<String> = Vec::with_capacity(total);

    for response in responses {
        let key = serde_json::to_string(&response)
            .map_err(|e| ConversionError::RpcError(format!("unserializable response: {}", e)))?;
        if seen.contains(&key) {
            return Ok(response);
        }
        seen.push(key);
    }

    Err(ConversionError::QuorumNotReached {
        fact: fact.to_string(),
        responses: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockSummary;

    #[test]
    fn test_two_agree() {
        assert_eq!(check_quorum(vec![7, 7], "n").unwrap(), 7);
    }

    #[test]
    fn test_first_recurrence_wins_not_majority() {
        // 2 recurs before 1 reaches its majority
        let responses = vec![1, 2, 2, 1, 1];
        assert_eq!(check_quorum(responses, "n").unwrap(), 2);
    }

    #[test]
    fn test_disagreeing_mirrors_ignored() {
        let responses = vec!["a", "b", "c", "b"];
        assert_eq!(check_quorum(responses, "rawtx/x").unwrap(), "b");
    }

    #[test]
    fn test_all_distinct_fails() {
        let result = check_quorum(vec![1, 2, 3], "block/ab");
        match result {
            Err(ConversionError::QuorumNotReached { fact, responses }) => {
                assert_eq!(fact, "block/ab");
                assert_eq!(responses, 3);
            }
            other => panic!("expected QuorumNotReached, got {:?}", other),
        }
    }

    #[test]
    fn test_single_or_no_response_fails() {
        assert!(check_quorum(vec![1], "n").is_err());
        assert!(check_quorum(Vec::<u8>::new(), "n").is_err());
    }

    #[test]
    fn test_structured_values_compared_by_content() {
        let block = |root: &str| BlockSummary {
            height: 10,
            merkleroot: root.to_string(),
            tx: vec!["aa".to_string()],
        };
        let responses = vec![block("01"), block("02"), block("01")];
        assert_eq!(check_quorum(responses, "block/h").unwrap().merkleroot, "01");
    }
}
