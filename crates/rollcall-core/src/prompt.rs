use crate::model::Lot;

const NAME_RULES: &str = "\
- Extract the COMPLETE student name as written (e.g., \"Smith, John\" or \"John Smith\")
- **CRITICAL: Extract ALL student names that are clearly written in the sign-in sheet**
- Only extract names from rows where a student name is clearly written
- Ignore empty rows and header rows
- Extract all students regardless of whether they have a time-out entry
- **IMPORTANT: Only skip a name if it has a clear line drawn through it (crossed out)**
- Do NOT skip names just because they have minor marks, corrections, or messy handwriting nearby
- A name is only \"crossed out\" if there is an obvious horizontal or diagonal line through the entire name
- Preserve the name format as written (Last, First or First Last)
- If handwriting is unclear but you can make out most of the name, include it with a note
- **IMPORTANT: The studentCount field MUST exactly match the number of names in the studentNames array**
- Count every single non-crossed-out name, even if handwriting is messy or partially illegible
- When in doubt about whether a name is crossed out, INCLUDE it in the extraction";

const SHEET_CONTEXT: &str = "This is a physical sign-in sheet where students manually write their names and check-in times for a band cleanup event.";

/// Prompt for a sheet whose lot is already known.
pub fn known_lot_prompt(lot_name: &str, lot_id: &str) -> String {
    format!(
        r#"You are analyzing a parking lot cleanup sign-in sheet for "{lot_name}" (Lot ID: {lot_id}).

{SHEET_CONTEXT}

TASK:
1. Extract the FULL NAME of each student who has SIGNED IN (has an entry in the "Student Name" column)
2. Count the TOTAL number of students who signed in
3. Look for the lot identification information at the top of the sheet (Zone, Lot Number, Lot Name, Address)
4. Verify the lot information matches "{lot_name}"
5. Note the quality of the image and any issues

IMPORTANT EXTRACTION RULES:
{NAME_RULES}

Please respond with valid JSON in this exact format:
{{
  "studentCount": <number of students who signed in>,
  "studentNames": ["Name as written on sheet", "Another Name"],
  "lotIdentified": "<lot name/number found on sheet>",
  "zoneIdentified": "<zone found on sheet, if any>",
  "confidence": "high|medium|low",
  "notes": "<any observations about sheet quality, issues, or discrepancies>",
  "illegibleNames": ["Partial name or description of illegible entry"]
}}

CONFIDENCE LEVELS:
- "high": Image is clear, all names are legible, lot info matches
- "medium": Image is acceptable, most names are legible, minor issues
- "low": Image is blurry, hard to read, or lot info doesn't match

EXAMPLES:
- If you see "Smith, John" written clearly -> include in studentNames
- If you see "J. Smith" or partial name -> include in studentNames with note
- If you see scribbled text that might be a name -> include in illegibleNames
- If row is completely empty -> ignore it

Be precise and thorough. Extract all readable names, even if handwriting is imperfect."#
    )
}

/// Prompt for a sheet whose lot must be read from its header.
pub fn lot_identification_prompt(available_lots: &[Lot]) -> String {
    let lot_names = available_lots
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are analyzing a parking lot cleanup sign-in sheet image.

{SHEET_CONTEXT}

TASK:
1. Extract the LOT IDENTIFICATION from the header (Zone, Lot Number, Lot Name, Address)
2. Extract the EVENT DATE from the header (e.g., "2025 Clean Up #2: September 14th")
3. Extract the FULL NAME of each student who has SIGNED IN
4. Count the TOTAL number of students who signed in
5. Note the quality of the image and any issues

HEADER INFORMATION TO EXTRACT:
- Zone (e.g., "Zone 1 East Side of River")
- Lot Number and Name (e.g., "Lot 3: Library Lot")
- Address (e.g., "123 Museum Drive")
- Event Date (e.g., "2025 Clean Up #2: September 14th")

AVAILABLE PARKING LOTS (for reference):
{lot_names}

IMPORTANT EXTRACTION RULES:
- Extract the COMPLETE lot name as it appears in the header
- Extract the event date exactly as written
{NAME_RULES}

Please respond with valid JSON in this exact format:
{{
  "lotIdentified": "<exact lot name from header>",
  "zoneIdentified": "<zone from header, if any>",
  "eventDate": "<event date from header, if any>",
  "studentCount": <number of students who signed in>,
  "studentNames": ["Name as written on sheet", "Another Name"],
  "confidence": "high|medium|low",
  "notes": "<any observations about sheet quality, issues, or discrepancies>",
  "illegibleNames": ["Partial name or description of illegible entry"]
}}

CONFIDENCE LEVELS:
- "high": Image is clear, all names are legible, lot info is clear
- "medium": Image is acceptable, most names are legible, minor issues
- "low": Image is blurry, hard to read, or lot info is unclear

Be precise and thorough. Extract all readable information from the header and student names."#
    )
}
