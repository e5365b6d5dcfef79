use rand::Rng;
use sqlx::PgPool;

const CODE_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
const CODE_LEN: usize = 6;
const MAX_ATTEMPTS: usize = 10;

/// Codes are stored lowercase; trims and lowercases whatever the client sent.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generate a candidate school code that is unused at the time of the check.
/// This cannot guarantee no collision under concurrent creation — the unique
/// index on `schools.code` is the correctness backstop; callers must treat a
/// unique violation on insert as a normal outcome.
pub async fn generate_candidate_code(pool: &PgPool) -> anyhow::Result<String> {
    for _ in 0..MAX_ATTEMPTS {
        let candidate = random_code();
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM schools WHERE code = $1)")
                .bind(&candidate)
                .fetch_one(pool)
                .await?;
        if !taken {
            return Ok(candidate);
        }
    }
    anyhow::bail!("Could not find an unused school code in {MAX_ATTEMPTS} attempts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize_code("  StMarys  "), "stmarys");
        assert_eq!(normalize_code("ABC123"), "abc123");
    }

    #[test]
    fn random_codes_use_the_expected_shape() {
        for _ in 0..100 {
            let code = random_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
            // Already normalized.
            assert_eq!(normalize_code(&code), code);
        }
    }
}
