//! Canned PE research answers used when the remote model is unavailable.
//!
//! Selection is a fixed, ordered keyword table over the lower-cased query.
//! Order matters: predicates overlap, and the first match wins.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTopic {
    Google,
    CompanyAnalysis,
    MarketIntelligence,
    FinancialAnalysis,
    DealSourcing,
    Overview,
}

impl FallbackTopic {
    pub fn text(self) -> &'static str {
        match self {
            FallbackTopic::Google => GOOGLE,
            FallbackTopic::CompanyAnalysis => COMPANY_ANALYSIS,
            FallbackTopic::MarketIntelligence => MARKET_INTELLIGENCE,
            FallbackTopic::FinancialAnalysis => FINANCIAL_ANALYSIS,
            FallbackTopic::DealSourcing => DEAL_SOURCING,
            FallbackTopic::Overview => OVERVIEW,
        }
    }
}

pub fn classify(query: &str) -> FallbackTopic {
    let q = query.to_lowercase();
    let has = |word: &str| q.contains(word);

    if has("google") && !has("fintech") {
        FallbackTopic::Google
    } else if has("slack") || (has("company") && has("analysis")) {
        FallbackTopic::CompanyAnalysis
    } else if has("market") && (has("opportunities") || has("intelligence")) {
        FallbackTopic::MarketIntelligence
    } else if has("financial") || has("saas") || has("buyout") {
        FallbackTopic::FinancialAnalysis
    } else if has("deal") || has("sourcing") || has("targets") || has("acquisition") {
        FallbackTopic::DealSourcing
    } else {
        FallbackTopic::Overview
    }
}

pub fn fallback(query: &str) -> &'static str {
    classify(query).text()
}

const GOOGLE: &str = "\
Google (Alphabet Inc.) - PE Investment Perspective

Company Overview:
Google/Alphabet is a publicly traded technology conglomerate (NASDAQ: GOOGL) with a market cap of approximately $2.1 trillion, making it one of the world's largest companies.

PE Investment Considerations:

Strategic Value:
- Dominant search market position (92% global market share)
- Diversified revenue streams: Search, YouTube, Cloud, Hardware
- Strong moat through data network effects and AI capabilities
- Revenue: $307B (2023), with 57% from Search advertising

Investment Attractiveness:
- High-margin advertising business (25-30% operating margins)
- Growing cloud computing division ($33B+ revenue)
- Strong cash generation ($73B free cash flow in 2023)
- Market-leading position in AI and machine learning

PE Angle:
While Google itself is too large for traditional PE buyouts, PE firms often target:
- Google's enterprise software competitors
- Companies in Google's supply chain
- Adjacent technology sectors where Google competes
- Former Google subsidiaries or spin-offs

Competitive Analysis:
Google's dominance creates investment opportunities in companies that either complement or compete with Google's ecosystem, particularly in emerging technologies like AI, autonomous vehicles, and cloud infrastructure.

Investment Thesis:
For PE firms, Google represents a benchmark for technology investments and a key competitive factor when evaluating deals in search, advertising technology, cloud services, and AI-related sectors.";

const COMPANY_ANALYSIS: &str = "\
Company Analysis Framework - PE Research

Key Analysis Components:

1. Financial Performance:
- Revenue growth trajectory and sustainability
- EBITDA margins and profitability trends
- Cash flow generation and working capital needs
- Debt structure and leverage ratios

2. Market Position:
- Market share and competitive landscape
- Barriers to entry and competitive moats
- Customer concentration and retention rates
- Pricing power and contract terms

3. PE Investment History:
- Previous PE ownership and value creation
- Management team experience with PE backing
- Historical exit multiples and IRR performance
- Comparable transaction analysis

4. Value Creation Opportunities:
- Operational efficiency improvements
- Revenue growth acceleration strategies
- Market expansion and M&A opportunities
- Digital transformation initiatives

5. Risk Assessment:
- Market cyclicality and economic sensitivity
- Regulatory and compliance requirements
- Technology disruption threats
- Key person dependency

Due Diligence Focus:
- Customer interviews and market validation
- Financial quality of earnings analysis
- Management presentation and background checks
- Legal and tax structure optimization

For specific company analysis, please provide the target company name and I'll deliver detailed PE-focused research including deal history, financial metrics, and investment considerations.";

const MARKET_INTELLIGENCE: &str = "\
PE Market Intelligence - 2024 Investment Landscape

Current Market Environment:
- $3.7T in global PE dry powder seeking deployment
- Average deal multiples: 12-15x EBITDA for quality assets
- Increased focus on operational value creation vs. multiple expansion
- Rising interest rates creating financing headwinds

Hot Investment Sectors:

1. Technology Services (25% of PE deals)
- Software-as-a-Service platforms
- Cybersecurity and data analytics
- Digital transformation enablers
- Enterprise automation tools

2. Healthcare (20% of PE deals)
- Revenue cycle management
- Specialty healthcare services
- Medical technology and devices
- Telehealth and digital health platforms

3. Business Services (18% of PE deals)
- Professional services automation
- Supply chain and logistics technology
- Financial services technology
- Human capital management

Key Investment Themes:
- Recurring revenue business models
- Technology-enabled service disruption
- ESG and sustainability focus
- Resilient, non-cyclical cash flows

Market Dynamics:
- Increased competition for quality assets
- Longer hold periods (5-7 years average)
- Greater emphasis on add-on acquisitions
- Enhanced focus on ESG compliance

Geographic Focus:
- North America: 65% of global PE activity
- Europe: 25% of deals, growing infrastructure focus
- Asia-Pacific: 10%, emerging market opportunities

Would you like deeper analysis on any specific sector or geographic market?";

const FINANCIAL_ANALYSIS: &str = "\
PE Financial Analysis Framework

Valuation Metrics by Sector:

SaaS Companies:
- Revenue Multiples: 8-15x (depending on growth rate)
- EBITDA Multiples: 25-40x (for high-growth companies)
- Key Metrics: ARR growth, churn rate, LTV/CAC ratio
- Rule of 40: Growth rate + EBITDA margin should exceed 40%

Traditional Industries:
- EBITDA Multiples: 8-12x (mature, stable businesses)
- Revenue Multiples: 2-4x (asset-heavy industries)
- Focus on cash flow stability and market position

Financial Performance Benchmarks:

Revenue Growth:
- High-growth targets: 25%+ annual growth
- Stable businesses: 10-15% organic growth
- Mature markets: 5-10% growth acceptable

Profitability Metrics:
- EBITDA margins: 15-25% target range
- Free cash flow conversion: 80%+ of EBITDA
- Working capital efficiency: <10% of revenue

Leverage Analysis:
- Target debt/EBITDA: 4-6x at acquisition
- Interest coverage: 3x+ EBITDA/interest expense
- Refinancing risk assessment

Value Creation Levers:
- Operational improvements: 20-30% of returns
- Multiple expansion: 15-25% of returns
- Revenue growth: 40-50% of returns
- Financial engineering: 10-15% of returns

Exit Considerations:
- Strategic vs. financial buyer optimization
- Public market readiness assessment
- Dividend recapitalization opportunities

Specific company analysis available upon request with detailed financial modeling and comparable transaction analysis.";

const DEAL_SOURCING: &str = "\
PE Deal Sourcing Strategy

Target Identification Framework:

1. Sector Focus Areas:
- Technology-enabled services ($25M-500M revenue)
- Healthcare services and technology
- Industrial automation and manufacturing
- Consumer brands with digital presence
- Financial services technology

2. Company Characteristics:
- Revenue range: $10M-1B depending on fund size
- EBITDA margins: 15%+ with growth potential
- Market-leading or niche positions
- Experienced management teams
- Scalable business models

3. Sourcing Channels:

Proprietary Deal Flow:
- Industry executive networks
- Former portfolio company management
- Sector-specific conferences and events
- Direct outreach to target companies

Intermediated Process:
- Investment bank auctions
- Business broker relationships
- Professional service provider referrals
- Corporate development spin-offs

4. Due Diligence Priorities:

Commercial:
- Market size and growth trajectory
- Competitive positioning analysis
- Customer concentration and retention
- Pricing power and contract terms

Financial:
- Quality of earnings assessment
- Working capital analysis
- Capital expenditure requirements
- Cash flow predictability

Operational:
- Management team capabilities
- Scalability of operations
- Technology infrastructure
- Key person dependencies

5. Deal Execution:
- Valuation modeling and bid strategy
- Management presentations and reference calls
- Legal and tax structure optimization
- Financing arrangement and syndication

Current Market Opportunities:
Focus on companies with defensive characteristics, recurring revenue models, and technology-enabled competitive advantages in fragmented markets.

Specific sector or geographic deal sourcing analysis available upon request.";

const OVERVIEW: &str = "\
PE Research Analysis - Professional Intelligence

I'm your specialized Private Equity research assistant. I can provide comprehensive analysis on:

Core Research Areas:
- Company Analysis - PE involvement history, financial performance, strategic positioning
- Market Intelligence - Investment opportunities, sector trends, competitive dynamics
- Financial Analysis - Valuation multiples, performance benchmarking, deal metrics
- Deal Sourcing - Target identification, due diligence frameworks, transaction analysis

Recent Market Insights:
- PE dry powder at record $3.7T globally
- Average hold periods extending to 5-7 years
- Focus shifting to operational value creation
- Technology and healthcare driving 45% of deal volume

Analysis Capabilities:
- Detailed company research with PE investment history
- Sector-specific market opportunity assessment
- Financial modeling and comparable analysis
- Due diligence frameworks and risk assessment
- Transaction structure and valuation guidance

To get started, ask me about:
- Specific companies (e.g., \"Analyze Microsoft's PE potential\")
- Market sectors (e.g., \"Healthcare technology opportunities\")
- Financial analysis (e.g., \"SaaS valuation multiples\")
- Deal sourcing (e.g., \"Fintech acquisition targets\")

What PE research topic would you like me to analyze for you?

Note: For the most current and detailed analysis, configure an Azure OpenAI deployment. I'm currently running on built-in fallback responses.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_excludes_fintech() {
        assert_eq!(classify("Tell me about Google"), FallbackTopic::Google);
        assert_eq!(classify("google fintech trends"), FallbackTopic::Overview);
        assert_ne!(fallback("google fintech trends"), GOOGLE);
    }

    #[test]
    fn test_google_with_fintech_still_matches_later_rules() {
        assert_eq!(
            classify("Google fintech acquisition targets"),
            FallbackTopic::DealSourcing
        );
    }

    #[test]
    fn test_company_analysis() {
        assert_eq!(classify("Analyze Slack"), FallbackTopic::CompanyAnalysis);
        assert_eq!(fallback("Analyze Slack"), COMPANY_ANALYSIS);
        assert_eq!(
            classify("company analysis for a logistics business"),
            FallbackTopic::CompanyAnalysis
        );
        // "company" alone is not enough.
        assert_eq!(classify("what does this company do"), FallbackTopic::Overview);
    }

    #[test]
    fn test_market_intelligence_needs_both_terms() {
        assert_eq!(
            classify("Healthcare market opportunities"),
            FallbackTopic::MarketIntelligence
        );
        assert_eq!(classify("MARKET INTELLIGENCE"), FallbackTopic::MarketIntelligence);
        assert_eq!(classify("market size"), FallbackTopic::Overview);
    }

    #[test]
    fn test_financial_analysis() {
        assert_eq!(classify("SaaS buyout multiples"), FallbackTopic::FinancialAnalysis);
        assert_eq!(fallback("SaaS buyout multiples"), FINANCIAL_ANALYSIS);
        assert_eq!(classify("financial health"), FallbackTopic::FinancialAnalysis);
    }

    #[test]
    fn test_deal_sourcing() {
        assert_eq!(classify("deal flow ideas"), FallbackTopic::DealSourcing);
        assert_eq!(classify("Fintech acquisition targets"), FallbackTopic::DealSourcing);
    }

    #[test]
    fn test_precedence_between_overlapping_rules() {
        // Company analysis beats financial, market beats deal sourcing.
        assert_eq!(
            classify("company analysis of financial buyout"),
            FallbackTopic::CompanyAnalysis
        );
        assert_eq!(
            classify("market opportunities for deal sourcing"),
            FallbackTopic::MarketIntelligence
        );
        assert_eq!(classify("slack google"), FallbackTopic::Google);
    }

    #[test]
    fn test_generic_default() {
        assert_eq!(classify("random unrelated text"), FallbackTopic::Overview);
        assert_eq!(fallback("random unrelated text"), OVERVIEW);
        assert_eq!(classify(""), FallbackTopic::Overview);
    }

    #[test]
    fn test_every_topic_has_text() {
        for topic in [
            FallbackTopic::Google,
            FallbackTopic::CompanyAnalysis,
            FallbackTopic::MarketIntelligence,
            FallbackTopic::FinancialAnalysis,
            FallbackTopic::DealSourcing,
            FallbackTopic::Overview,
        ] {
            let text = topic.text();
            assert!(!text.trim().is_empty());
            assert!(!text.contains("**"), "{topic:?} uses markdown");
        }
    }
}
