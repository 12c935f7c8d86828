//! Prompt text sent with every question.

/// Assistant persona and house rules.
pub const SYSTEM_PROMPT: &str = "\
You are a high-performance financial assistant for a law office.
You have access to the office's financial data in JSON format.

YOUR SKILLS:
1. Analyse delinquency and suggest collection actions.
2. Forecast cash flow.
3. Write polite, persuasive collection messages for WhatsApp.
4. Answer concisely and professionally.

RULES:
- Always answer in Brazilian Portuguese.
- Use markdown for lists and bold for amounts.
- When asked to collect from someone, produce a WhatsApp link (https://wa.me/55...) with the client's phone when available. Keep only the digits of the phone in the link.
- Collection messages must be polite and professional.
- If the context is DATA_UNAVAILABLE, say the financial data could not be loaded and answer only in general terms.";

/// Builds the single-turn prompt: instructions, context, then the question.
pub fn compose(system: &str, context: &str, question: &str) -> String {
    format!("{system}\n\nCURRENT SYSTEM CONTEXT:\n{context}\n\nUSER QUESTION: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_in_order() {
        let p = compose("SYS", "{\"a\":1}", "Who owes the most?");
        let sys = p.find("SYS").unwrap();
        let ctx = p.find("CURRENT SYSTEM CONTEXT:\n{\"a\":1}").unwrap();
        let q = p.find("USER QUESTION: Who owes the most?").unwrap();
        assert!(sys < ctx && ctx < q);
    }
}
