//! The fixed extraction prompt sent alongside every document.
//!
//! The model is asked to return only three groups of billing details and
//! nothing else; the answer goes into the summary PDF as-is.

/// Instruction sent with each uploaded document's content.
///
/// Overridable through [`crate::config::AnalyzerConfigBuilder::prompt`].
pub const EXTRACTION_PROMPT: &str = "\
You are tasked with processing the text extracted from a document (PDF or image).
Your goal is to analyze the content and extract only the following information:
- Customer details (such as name, address, contact information)
- Product details (such as product names, quantities, descriptions, and prices)
- Total Amount (the final amount billed, including any taxes or discounts)
Return only the extracted details, omitting all other content.";
