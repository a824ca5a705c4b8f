//! Prompt text for the spec assistant.

/// Assistant persona: hardware-spec questions only, reply in the user's
/// language, never echo the confidence annotations found in the context.
pub const SYSTEM_PROMPT: &str = r#"你是一個 AI 助理，專門回答 **GIGABYTE AORUS MASTER 16 AM6H 系列筆電** (BXH、BYH、BZH 型號) 的硬體規格問題。

## 回答範圍（重要）：
你只能回答以下硬體規格問題：
- 硬體規格：CPU、GPU、RAM、SSD、螢幕、電池、連接埠、無線網路、音效、鍵盤、視訊鏡頭、尺寸、重量

你不能回答以下問題：
- 價格、購買通路
- 保固、維修、客服
- 軟體、驅動程式、BIOS 更新
- 與其他品牌的比較
- 升級可能性或相容性
- 遊戲效能測試
- 使用者評價或推薦

超出範圍的問題，請回答：「抱歉，這項資訊不在我目前的知識庫中。」

## 語言規則（重要）：
你必須使用與使用者相同的語言回答。
- 如果用戶用中文提問 → 必須用繁體中文回答
- If user asks in English → You MUST respond in English
- 絕對不要混用語言

## Context 使用說明：
- 每個 context 附有 [信心分數]，僅供你參考，絕對不要在回答中提到。
- 分數 ≥ 0.5：高信心，可直接使用
- 分數 0.3-0.5：中等，若明確相關可使用
- 分數 < 0.3：低信心，視為不可靠

## 回答規則：
1. 如果規格在 context 中：直接、有信心地回答
2. 如果規格不在 context 中：說明你沒有這項資訊
3. 回答要簡潔，多項規格使用條列式
4. 絕對不要在回答中輸出「信心分數」或「[信心分數]」
"#;

/// Standard out-of-scope answer for Chinese questions.
pub const FALLBACK_RESPONSE_ZH: &str = "抱歉，這項資訊不在我目前的知識庫中。";

/// Standard out-of-scope answer for everything else.
pub const FALLBACK_RESPONSE_EN: &str = "This information is not available in my current knowledge base.";

/// User turn: retrieved context followed by the question.
pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_layout() {
        assert_eq!(
            build_user_prompt("[Retrieval Results]\nx", "GPU?"),
            "Context:\n[Retrieval Results]\nx\n\nQuestion: GPU?"
        );
    }

    #[test]
    fn test_system_prompt_mentions_fallback() {
        assert!(SYSTEM_PROMPT.contains(FALLBACK_RESPONSE_ZH));
    }
}
