//! Generation prompt assembly.
//!
//! Kept as a pure function so the prompt shape is testable without invoking
//! the generation service.

use crate::types::UserProfile;

const GUIDELINES: &str = "Guidelines:\n\
    1. Be authoritative but supportive\n\
    2. Relate answers to surgical practice\n\
    3. Suggest practical exercises when relevant\n\
    4. Use medical terminology appropriately\n\
    5. Reference real-world surgical cases";

const NO_CONTEXT: &str = "No specific medical context documents available.";

/// Blend persona, retrieved context, session transcript, and the current
/// question into a single generation prompt.
pub fn build_mentor_prompt(
    profile: &UserProfile,
    context: &str,
    transcript: &str,
    message: &str,
) -> String {
    let context = if context.trim().is_empty() {
        NO_CONTEXT
    } else {
        context
    };

    format!(
        "You are Dr. {name}'s surgical mentor at {college} with 30 years experience.\n\
         Student specializes in {specialization}. Respond as a medical professor guiding a resident.\n\n\
         Medical Context:\n{context}\n\n\
         Conversation History:\n{transcript}\n\n\
         Current Question: {message}\n\n\
         {guidelines}",
        name = profile.name,
        college = profile.college,
        specialization = profile.specialization,
        context = context,
        transcript = transcript,
        message = message,
        guidelines = GUIDELINES,
    )
}
