/*!

This is the long-form manual for `form_accuracy` and `scanacc`.

## Inputs

Two sources are compared:
* the **ground truth**: an Excel workbook (`.xlsx`) where each row holds the verified values of one paper form.
  The first row of every sheet is a header and is skipped.
* the **scan output**: a directory with one sub-folder per scanned form. Each sub-folder contains a small text file
  with the client identifier of the form (`clientID.txt` by default) and the JSON document produced by the scanner
  (`output.json` by default), of the form `{"fields": [{"value": "..."}, ...]}`.

Both sources are keyed by client identifier. Identifiers are trimmed and their leading zeroes removed, so that
`00123` in the workbook matches `123` in the scan output. If an identifier appears more than once in a source, all
of its records are dropped from that source: there is no way to tell which one is correct.

## Field kinds

Every field of the form declares how it is compared. The unit of comparison depends on the kind:

* `identifier` the client id, zero-padded to a fixed width (5 by default) then compared digit by digit.
* `digits` a number, compared digit by digit from the right. Characters that are not digits in the verified value
  are skipped, and extra digits on the left of the longer value are ignored.
* `date` a `day/month/year` date. Each part is compared as digits. Four-digit years are reduced to their last two
  digits, so `5/7/2015` fully matches `05/07/15`. A scanned value that is not a date is not scored.
* `bubble` a "bubble many" question. The verified value lists the selected codes (`3,6`), the scanner writes the
  labels of the filled bubbles. Every bubble counts for one unit: it is correct when both sources agree that it is
  filled or that it is empty.
* `categorical` a short answer such as `yes` / `no`, worth 2 units, all or nothing.
* `auto` (the default) picks one of `date`, `digits` or `categorical` by looking at the verified value.

Verified values that are empty, `null` or `inconclusive` are not scored, and neither is a field that the scanner
did not output at all.

## Output

For every field, the number of correct units out of the number of compared units. The fields are also summed by
category (`digit`, `bubble`, `categorical`) and overall. The number of client ids found in both sources, only in the
ground truth and only in the scan output is reported as well.

The fields whose comparison is not perfect are logged at the `info` level, with both values.

## Configuration

```json
{
  "groundTruth": { "filePath": "master.xlsx", "sheets": ["#3"], "idColumn": "P" },
  "scanOutput": { "rootDirectory": "scan_output" },
  "fields": [
    { "name": "client_id", "column": "P", "position": 3, "kind": "identifier" },
    { "name": "age", "column": "AA", "position": 5, "kind": "digits" }
  ]
}
```

`column` is the letter of the column in the workbook, `position` the index (starting at 0) of the field in the
`fields` array of the scanner document.

## Alignment scores

The workbook may also record how badly each form was misaligned on the scanner, in a set of columns (`none`,
`small`, `medium`, `large`). `scanacc alignment` prints the mean rating of every scanned folder, which helps
relating reading errors to alignment problems.

*/
